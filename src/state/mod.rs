mod event;
mod leaderboard;
mod question;
mod submission;

pub use submission::{NewSubmission, SubmissionEntry, UpdateSubmission, MAX_ENTRIES_PER_USERNAME};

use std::sync::Arc;

use crate::store::{EventStore, StoreError};

/// Shared application state: everything goes through the store seam.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors surfaced by state operations. Validation failures carry the
/// message shown to the caller; store errors pass through.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("event not found")]
    EventNotFound,

    #[error("question not found")]
    QuestionNotFound,

    #[error("submission not found")]
    SubmissionNotFound,

    #[error("event is locked and no longer accepts submissions")]
    EventLocked,

    #[error("{0}")]
    Invalid(String),

    #[error("submission limit reached: at most {0} entries per username")]
    EntryLimit(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}
