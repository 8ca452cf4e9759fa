//! Deadline locking. Events lock when the current time reaches their
//! scheduled start, with both instants compared in the pool's home timezone
//! so the cutoff is the same for every participant regardless of where they
//! are watching from.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;

use crate::store::{EventStore, StoreResult};
use crate::types::Event;

/// The fixed civil timezone all deadline comparisons happen in
pub const EVENT_TZ: Tz = chrono_tz::America::New_York;

/// Civil (year, month, day, hour, minute) of an instant in the event zone.
/// Seconds are discarded; events are scheduled to the minute.
fn civil_minute(instant: DateTime<Utc>) -> (i32, u32, u32, u32, u32) {
    let local = instant.with_timezone(&EVENT_TZ);
    (
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
    )
}

/// Whether an event scheduled at `scheduled` should be locked at `now`.
/// True iff now's civil tuple is >= the scheduled tuple, so the lock fires
/// at the start of the scheduled minute. A missing schedule never locks
/// (fail safe toward remaining open).
pub fn should_lock(now: DateTime<Utc>, scheduled: Option<DateTime<Utc>>) -> bool {
    let Some(scheduled) = scheduled else {
        return false;
    };
    civil_minute(now) >= civil_minute(scheduled)
}

/// Lock an event if its deadline has passed. Returns whether this call
/// performed the transition.
///
/// Safe to invoke redundantly and concurrently from many callers (page
/// views, the periodic watcher, feed notifications): an already-locked
/// event returns immediately without reading the clock or writing, and
/// racing lockers all write the same fixed value. The controller never
/// unlocks. A failed write surfaces as the store error; callers treat it as
/// retryable and keep serving (failing to lock promptly is a liveness
/// issue, not a correctness one — intake re-verifies lock state at write
/// time).
pub async fn maybe_lock(store: &dyn EventStore, event: &Event) -> StoreResult<bool> {
    if event.is_locked {
        return Ok(false);
    }
    if !should_lock(Utc::now(), event.scheduled_at) {
        return Ok(false);
    }

    store.set_event_locked(&event.id).await?;
    tracing::info!(event_id = %event.id, "event locked; no further submissions accepted");
    Ok(true)
}
