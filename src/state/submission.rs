use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{AppState, DomainError, DomainResult};
use crate::store::EventStore;
use crate::types::{Pick, Submission};

/// Cap on entries per username per event. Soft anti-spam measure; duplicate
/// usernames below the cap are only flagged in the admin listing, never
/// rejected.
pub const MAX_ENTRIES_PER_USERNAME: usize = 5;

/// An incoming pick sheet, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub picks: Vec<Pick>,
}

/// Admin edit of an existing entry
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSubmission {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub picks: Vec<Pick>,
}

/// A submission annotated for the admin entry listing
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionEntry {
    #[serde(flatten)]
    pub submission: Submission,
    /// True when this username holds more than one entry for the event
    pub duplicate_username: bool,
}

impl AppState {
    /// Accept a pick sheet for an event.
    ///
    /// Runs the lock check first and re-verifies the resulting state, so a
    /// submission can never land on an event whose record shows locked.
    /// Every question must be answered with a well-formed answer for its
    /// kind; picks for questions that no longer exist are dropped; the
    /// username is normalized to lowercase and capped at
    /// [`MAX_ENTRIES_PER_USERNAME`] entries.
    pub async fn submit_picks(
        &self,
        event_id: &str,
        new: NewSubmission,
    ) -> DomainResult<Submission> {
        let event = self.event_with_lock_check(event_id).await?;
        if event.is_locked {
            return Err(DomainError::EventLocked);
        }

        let username = new.username.trim().to_lowercase();
        let first_name = new.first_name.trim().to_string();
        let last_name = new.last_name.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::Invalid("username is required".to_string()));
        }
        if first_name.is_empty() || last_name.is_empty() {
            return Err(DomainError::Invalid(
                "first and last name are required".to_string(),
            ));
        }

        let questions = self.store.questions_for_event(event_id).await?;
        let picks = validate_picks(&questions, new.picks)?;

        let existing = self
            .store
            .submissions_for_username(event_id, &username)
            .await?;
        if existing.len() >= MAX_ENTRIES_PER_USERNAME {
            return Err(DomainError::EntryLimit(MAX_ENTRIES_PER_USERNAME));
        }

        let submission = Submission {
            id: ulid::Ulid::new().to_string(),
            event_id: event_id.to_string(),
            username,
            first_name,
            last_name,
            picks,
            submitted_at: Utc::now(),
        };
        self.store.insert_submission(submission.clone()).await?;
        tracing::info!(
            event_id,
            submission_id = %submission.id,
            username = %submission.username,
            "picks submitted"
        );
        Ok(submission)
    }

    /// Admin edit of an entry: fix a typo'd name or correct picks. Skips
    /// the lock check (admins may fix entries after lock) but keeps the
    /// same pick validation.
    pub async fn update_submission(
        &self,
        submission_id: &str,
        update: UpdateSubmission,
    ) -> DomainResult<Submission> {
        let current = self
            .store
            .get_submission(submission_id)
            .await?
            .ok_or(DomainError::SubmissionNotFound)?;

        let username = update.username.trim().to_lowercase();
        if username.is_empty() {
            return Err(DomainError::Invalid("username is required".to_string()));
        }

        let questions = self.store.questions_for_event(&current.event_id).await?;
        let picks = validate_picks(&questions, update.picks)?;

        let updated = Submission {
            username,
            first_name: update.first_name.trim().to_string(),
            last_name: update.last_name.trim().to_string(),
            picks,
            ..current
        };
        self.store.update_submission(updated.clone()).await?;
        Ok(updated)
    }

    /// All entries for an event, flagged when a username holds more than
    /// one. Detection only; nothing is rejected on this basis.
    pub async fn entries_for_event(&self, event_id: &str) -> DomainResult<Vec<SubmissionEntry>> {
        if self.store.get_event(event_id).await?.is_none() {
            return Err(DomainError::EventNotFound);
        }
        let mut submissions = self.store.submissions_for_event(event_id).await?;
        submissions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for submission in &submissions {
            *counts.entry(submission.username.as_str()).or_insert(0) += 1;
        }
        let duplicates: HashSet<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(username, _)| username.to_string())
            .collect();

        Ok(submissions
            .into_iter()
            .map(|submission| SubmissionEntry {
                duplicate_username: duplicates.contains(&submission.username),
                submission,
            })
            .collect())
    }
}

/// Check that every question is answered with a well-formed answer for its
/// kind. Picks referencing unknown questions are dropped as stale;
/// duplicate picks for one question keep the first seen.
fn validate_picks(
    questions: &[crate::types::Question],
    picks: Vec<Pick>,
) -> DomainResult<Vec<Pick>> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(picks.len());
    for pick in picks {
        let Some(question) = questions.iter().find(|q| q.id == pick.question_id) else {
            continue;
        };
        if !seen.insert(pick.question_id.clone()) {
            continue;
        }
        if !question.kind.accepts(&pick.answer) {
            return Err(DomainError::Invalid(format!(
                "\"{}\" is not a valid answer for question \"{}\"",
                pick.answer, question.text
            )));
        }
        kept.push(pick);
    }

    let unanswered = questions.len() - kept.len();
    if unanswered > 0 {
        return Err(DomainError::Invalid(format!(
            "please answer all questions ({} remaining)",
            unanswered
        )));
    }
    Ok(kept)
}
