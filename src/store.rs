//! Document-store seam. The core only ever talks to persistence through
//! [`EventStore`]: fetch-by-id, equality queries with a fixed sort, inserts
//! from the intake/admin surface, two single-field writes, and a cancellable
//! change subscription. [`MemStore`] is the in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::types::{Event, EventId, Question, Submission};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("question not found: {0}")]
    QuestionNotFound(String),

    #[error("submission not found: {0}")]
    SubmissionNotFound(String),
}

/// Notification that some record of an event changed. Carries no delta; the
/// consumer refetches the full collection and recomputes, matching the
/// recompute-from-scratch scoring model.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub event_id: EventId,
}

/// Handle to a live update feed for one event. Dropping it cancels the
/// subscription.
pub struct Subscription {
    event_id: EventId,
    rx: broadcast::Receiver<ChangeNotice>,
}

impl Subscription {
    /// Wait until something about the subscribed event changes. Returns
    /// false once the store side of the channel is gone. A lagged receiver
    /// still returns true: under the replace-snapshot model, catching up is
    /// a single refetch no matter how many notifications were missed.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(notice) if notice.event_id == self.event_id => return true,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, id: &str) -> StoreResult<Option<Event>>;

    /// All events, most recently scheduled first
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn insert_event(&self, event: Event) -> StoreResult<()>;

    /// Single-field write: set `is_locked = true` on one event. The target
    /// value is fixed, so concurrent duplicate writes are benign.
    async fn set_event_locked(&self, id: &str) -> StoreResult<()>;

    async fn get_question(&self, id: &str) -> StoreResult<Option<Question>>;

    /// Questions of one event in ascending display order
    async fn questions_for_event(&self, event_id: &str) -> StoreResult<Vec<Question>>;

    async fn insert_question(&self, question: Question) -> StoreResult<()>;

    async fn set_question_order(&self, id: &str, order: u32) -> StoreResult<()>;

    /// Single-field write: record the graded answer for one question
    async fn set_correct_answer(&self, id: &str, answer: String) -> StoreResult<()>;

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>>;

    async fn submissions_for_event(&self, event_id: &str) -> StoreResult<Vec<Submission>>;

    /// Equality query on (event, username); username is stored lowercased
    async fn submissions_for_username(
        &self,
        event_id: &str,
        username: &str,
    ) -> StoreResult<Vec<Submission>>;

    async fn insert_submission(&self, submission: Submission) -> StoreResult<()>;

    async fn update_submission(&self, submission: Submission) -> StoreResult<()>;

    /// Subscribe to the live update feed for one event
    fn subscribe(&self, event_id: &str) -> Subscription;
}

/// In-memory store: one RwLock'd map per record type plus a broadcast
/// channel carrying change notices.
pub struct MemStore {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
    questions: Arc<RwLock<HashMap<String, Question>>>,
    submissions: Arc<RwLock<HashMap<String, Submission>>>,
    changes: broadcast::Sender<ChangeNotice>,
}

impl MemStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(HashMap::new())),
            changes: tx,
        }
    }

    fn notify(&self, event_id: &str) {
        // Ignore send errors (no subscribers is fine)
        let _ = self.changes.send(ChangeNotice {
            event_id: event_id.to_string(),
        });
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemStore {
    async fn get_event(&self, id: &str) -> StoreResult<Option<Event>> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.events.read().await.values().cloned().collect();
        events.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(events)
    }

    async fn insert_event(&self, event: Event) -> StoreResult<()> {
        let id = event.id.clone();
        self.events.write().await.insert(id.clone(), event);
        self.notify(&id);
        Ok(())
    }

    async fn set_event_locked(&self, id: &str) -> StoreResult<()> {
        {
            let mut events = self.events.write().await;
            let event = events
                .get_mut(id)
                .ok_or_else(|| StoreError::EventNotFound(id.to_string()))?;
            event.is_locked = true;
        }
        self.notify(id);
        Ok(())
    }

    async fn get_question(&self, id: &str) -> StoreResult<Option<Question>> {
        Ok(self.questions.read().await.get(id).cloned())
    }

    async fn questions_for_event(&self, event_id: &str) -> StoreResult<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| q.event_id == event_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    async fn insert_question(&self, question: Question) -> StoreResult<()> {
        let event_id = question.event_id.clone();
        self.questions
            .write()
            .await
            .insert(question.id.clone(), question);
        self.notify(&event_id);
        Ok(())
    }

    async fn set_question_order(&self, id: &str, order: u32) -> StoreResult<()> {
        let event_id = {
            let mut questions = self.questions.write().await;
            let question = questions
                .get_mut(id)
                .ok_or_else(|| StoreError::QuestionNotFound(id.to_string()))?;
            question.order = order;
            question.event_id.clone()
        };
        self.notify(&event_id);
        Ok(())
    }

    async fn set_correct_answer(&self, id: &str, answer: String) -> StoreResult<()> {
        let event_id = {
            let mut questions = self.questions.write().await;
            let question = questions
                .get_mut(id)
                .ok_or_else(|| StoreError::QuestionNotFound(id.to_string()))?;
            question.correct_answer = Some(answer);
            question.event_id.clone()
        };
        self.notify(&event_id);
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
        Ok(self.submissions.read().await.get(id).cloned())
    }

    async fn submissions_for_event(&self, event_id: &str) -> StoreResult<Vec<Submission>> {
        Ok(self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn submissions_for_username(
        &self,
        event_id: &str,
        username: &str,
    ) -> StoreResult<Vec<Submission>> {
        Ok(self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.event_id == event_id && s.username == username)
            .cloned()
            .collect())
    }

    async fn insert_submission(&self, submission: Submission) -> StoreResult<()> {
        let event_id = submission.event_id.clone();
        self.submissions
            .write()
            .await
            .insert(submission.id.clone(), submission);
        self.notify(&event_id);
        Ok(())
    }

    async fn update_submission(&self, submission: Submission) -> StoreResult<()> {
        let event_id = submission.event_id.clone();
        {
            let mut submissions = self.submissions.write().await;
            if !submissions.contains_key(&submission.id) {
                return Err(StoreError::SubmissionNotFound(submission.id.clone()));
            }
            submissions.insert(submission.id.clone(), submission);
        }
        self.notify(&event_id);
        Ok(())
    }

    fn subscribe(&self, event_id: &str) -> Subscription {
        Subscription {
            event_id: event_id.to_string(),
            rx: self.changes.subscribe(),
        }
    }
}
