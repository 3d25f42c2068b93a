//! Presence constants and the presence-change event.

use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UserId};

/// How often the liveness sweep runs (in seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Presence entries idle for longer than this many seconds are evicted.
pub const DEFAULT_STALE_SECS: u64 = 60;

/// Interval between WebSocket heartbeat pings (in seconds).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 20;

/// A user came online or went offline.
///
/// Published on the shared presence topic and mirrored to the durable
/// `online` / `last_seen` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    pub user_id: UserId,
    pub online: bool,
    /// When the transition was observed.
    pub at: Timestamp,
}

impl PresenceChange {
    pub fn online(user_id: impl Into<UserId>, at: Timestamp) -> Self {
        Self {
            user_id: user_id.into(),
            online: true,
            at,
        }
    }

    pub fn offline(user_id: impl Into<UserId>, at: Timestamp) -> Self {
        Self {
            user_id: user_id.into(),
            online: false,
            at,
        }
    }

    /// Value to store as `last_seen`: only set on the transition to offline.
    pub fn last_seen(&self) -> Option<Timestamp> {
        (!self.online).then_some(self.at)
    }
}
