//! Background deadline watcher.

use std::sync::Arc;
use std::time::Duration;

use crate::lock;
use crate::state::AppState;
use crate::store::EventStore;

/// How often the watcher sweeps events past their deadline
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a background task that runs every unlocked active event through
/// the lock controller once a minute. Browsers viewing an event trigger
/// the same check on fetch; this task covers events nobody is looking at.
pub fn spawn_lock_watcher(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;

            let events = match state.store.list_events().await {
                Ok(events) => events,
                Err(error) => {
                    tracing::warn!(%error, "lock sweep could not list events");
                    continue;
                }
            };

            for event in events.iter().filter(|e| e.is_active && !e.is_locked) {
                // A failed write is retried on the next sweep
                if let Err(error) = lock::maybe_lock(state.store.as_ref(), event).await {
                    tracing::warn!(event_id = %event.id, %error, "lock sweep write failed");
                }
            }
        }
    });
}
