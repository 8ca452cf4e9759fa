use super::{AppState, DomainError, DomainResult};
use crate::leaderboard::{self, Leaderboard};
use crate::store::EventStore;
use crate::types::Event;

impl AppState {
    /// Compute the leaderboard for an event: a fresh full pass over the
    /// current questions and submissions. Independent of lock state — a
    /// leaderboard is viewable whether or not the event still accepts
    /// entries.
    pub async fn leaderboard(&self, event_id: &str) -> DomainResult<Leaderboard> {
        if self.store.get_event(event_id).await?.is_none() {
            return Err(DomainError::EventNotFound);
        }
        let questions = self.store.questions_for_event(event_id).await?;
        let submissions = self.store.submissions_for_event(event_id).await?;
        Ok(leaderboard::compute_leaderboard(&questions, &submissions))
    }

    /// Event plus its freshly recomputed leaderboard, with the lock
    /// controller run first — the shape pushed to live feed subscribers on
    /// every change.
    pub async fn snapshot(&self, event_id: &str) -> DomainResult<(Event, Leaderboard)> {
        let event = self.event_with_lock_check(event_id).await?;
        let leaderboard = self.leaderboard(event_id).await?;
        Ok((event, leaderboard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NewSubmission;
    use crate::store::MemStore;
    use crate::types::{ChoiceOption, Pick, QuestionKind};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_leaderboard_reflects_grading() {
        let state = AppState::new(Arc::new(MemStore::new()));
        let event = state
            .create_event(
                "Pool".to_string(),
                String::new(),
                Some(Utc::now() + Duration::hours(1)),
            )
            .await
            .unwrap();
        let question = state
            .add_question(
                &event.id,
                "Winner".to_string(),
                QuestionKind::MultipleChoice {
                    options: vec![
                        ChoiceOption {
                            id: "a".to_string(),
                            text: "Team A".to_string(),
                        },
                        ChoiceOption {
                            id: "b".to_string(),
                            text: "Team B".to_string(),
                        },
                    ],
                },
                1,
            )
            .await
            .unwrap();
        state
            .submit_picks(
                &event.id,
                NewSubmission {
                    username: "george".to_string(),
                    first_name: "George".to_string(),
                    last_name: "Jones".to_string(),
                    picks: vec![Pick {
                        question_id: question.id.clone(),
                        answer: "a".to_string(),
                    }],
                },
            )
            .await
            .unwrap();

        // Ungraded: zero correct, but the entry exists
        let board = state.leaderboard(&event.id).await.unwrap();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].correct_answers, 0);
        assert!(board.stats.is_empty());

        state
            .grade_question(&question.id, "a".to_string())
            .await
            .unwrap();

        let board = state.leaderboard(&event.id).await.unwrap();
        assert_eq!(board.entries[0].correct_answers, 1);
        assert_eq!(board.stats.len(), 1);
        assert_eq!(board.stats[0].total_correct, 1);
    }

    #[tokio::test]
    async fn test_snapshot_runs_lock_check() {
        let state = AppState::new(Arc::new(MemStore::new()));
        let event = state
            .create_event(
                "Started".to_string(),
                String::new(),
                Some(Utc::now() - Duration::minutes(2)),
            )
            .await
            .unwrap();

        let (snapped, board) = state.snapshot(&event.id).await.unwrap();
        assert!(snapped.is_locked);
        assert!(board.entries.is_empty());
    }
}
