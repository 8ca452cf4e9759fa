use chrono::{DateTime, Utc};

use super::{AppState, DomainError, DomainResult};
use crate::lock;
use crate::store::EventStore;
use crate::types::Event;

impl AppState {
    /// Create a new event. Organizer-facing; events start active and
    /// unlocked.
    pub async fn create_event(
        &self,
        name: String,
        description: String,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Event> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Invalid("event name is required".to_string()));
        }

        let event = Event {
            id: ulid::Ulid::new().to_string(),
            name,
            description: description.trim().to_string(),
            scheduled_at,
            is_active: true,
            is_locked: false,
            created_at: Utc::now(),
        };
        self.store.insert_event(event.clone()).await?;
        tracing::info!(event_id = %event.id, name = %event.name, "event created");
        Ok(event)
    }

    /// All events, most recently scheduled first
    pub async fn list_events(&self) -> DomainResult<Vec<Event>> {
        Ok(self.store.list_events().await?)
    }

    /// Events currently visible to participants
    pub async fn active_events(&self) -> DomainResult<Vec<Event>> {
        let events = self.store.list_events().await?;
        Ok(events.into_iter().filter(|e| e.is_active).collect())
    }

    /// Fetch an event, running the lock controller first so a page view
    /// past the deadline observes the locked state. A failed lock write is
    /// logged and absorbed: viewing never fails because locking could not
    /// be persisted, and the next check retries.
    pub async fn event_with_lock_check(&self, id: &str) -> DomainResult<Event> {
        let event = self
            .store
            .get_event(id)
            .await?
            .ok_or(DomainError::EventNotFound)?;

        match lock::maybe_lock(self.store.as_ref(), &event).await {
            Ok(true) => Ok(self
                .store
                .get_event(id)
                .await?
                .ok_or(DomainError::EventNotFound)?),
            Ok(false) => Ok(event),
            Err(error) => {
                tracing::warn!(event_id = %id, %error, "auto-lock write failed; retrying on next check");
                Ok(event)
            }
        }
    }
}
