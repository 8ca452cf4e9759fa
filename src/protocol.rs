use serde::{Deserialize, Serialize};

use crate::leaderboard::Leaderboard;
use crate::types::{Event, EventId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Switch the connection to another event's feed
    Subscribe { event_id: EventId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full replacement snapshot: the event record plus a freshly
    /// recomputed leaderboard. Sent on subscribe and after every change;
    /// clients discard whatever they held before.
    Snapshot {
        event: Event,
        leaderboard: Leaderboard,
        server_now: String,
    },
    Error {
        message: String,
    },
}
