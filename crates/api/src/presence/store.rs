//! Concurrent presence map.
//!
//! Every connect, activity, disconnect, and sweep for the same user goes
//! through the entry's shard lock, so per-user transitions are linearizable
//! without a global lock. Lookups never touch I/O.
//!
//! The `*_then` variants run a hook while the entry is still locked. The
//! hook must not block or touch the store again; announcing a transition
//! from inside it keeps announcements in the same order as the transitions
//! themselves.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parley_core::types::{now, Timestamp, UserId};

/// Authoritative record of which users are currently reachable.
///
/// At most one entry exists per user. Shared via `Arc<PresenceStore>` and
/// injected into every component that needs it.
#[derive(Debug, Default)]
pub struct PresenceStore {
    entries: DashMap<UserId, Timestamp>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh the user's entry with the current time.
    ///
    /// Returns `true` only when the user was not online before, which is the
    /// caller's cue to announce the transition.
    pub fn connect(&self, user_id: &str) -> bool {
        self.connect_at(user_id, now())
    }

    /// [`connect`](Self::connect) with an explicit activity time.
    pub fn connect_at(&self, user_id: &str, at: Timestamp) -> bool {
        self.connect_then(user_id, at, || {})
    }

    /// Connect, running `on_online` under the entry lock if the user was
    /// offline.
    pub fn connect_then(&self, user_id: &str, at: Timestamp, on_online: impl FnOnce()) -> bool {
        match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if at > *entry.get() {
                    entry.insert(at);
                }
                false
            }
            Entry::Vacant(entry) => {
                let _locked = entry.insert(at);
                on_online();
                true
            }
        }
    }

    /// Record activity for an already-online user.
    ///
    /// Returns `false` if the user has no entry (never connected, or evicted
    /// by a sweep); the entry is not recreated.
    pub fn touch(&self, user_id: &str) -> bool {
        self.touch_at(user_id, now())
    }

    pub fn touch_at(&self, user_id: &str, at: Timestamp) -> bool {
        match self.entries.get_mut(user_id) {
            Some(mut last) => {
                if at > *last {
                    *last = at;
                }
                true
            }
            None => false,
        }
    }

    /// Remove the user's entry.
    ///
    /// Returns `true` only for the call that actually removed it. Removing
    /// an absent entry is a no-op, so a disconnect racing a sweep eviction
    /// yields exactly one `true` between them.
    pub fn disconnect(&self, user_id: &str) -> bool {
        self.disconnect_then(user_id, || {})
    }

    /// Disconnect, running `on_offline` under the entry lock if an entry was
    /// removed.
    pub fn disconnect_then(&self, user_id: &str, on_offline: impl FnOnce()) -> bool {
        match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(entry) => {
                on_offline();
                entry.remove();
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn last_activity(&self, user_id: &str) -> Option<Timestamp> {
        self.entries.get(user_id).map(|e| *e.value())
    }

    /// Remove every entry idle for longer than `max_idle` as of `now`.
    ///
    /// Returns the evicted user ids; each one must be announced offline by
    /// the caller.
    pub fn sweep(&self, now: Timestamp, max_idle: Duration) -> Vec<UserId> {
        self.sweep_then(now, max_idle, |_| {})
    }

    /// Sweep, running `on_evict` for each evicted user while its shard is
    /// still locked.
    pub fn sweep_then(
        &self,
        now: Timestamp,
        max_idle: Duration,
        mut on_evict: impl FnMut(&str),
    ) -> Vec<UserId> {
        let mut evicted = Vec::new();
        self.entries.retain(|user_id, last| {
            // Activity stamped after `now` has a negative age and is kept.
            let idle = (now - *last).to_std().unwrap_or_default();
            if idle > max_idle {
                on_evict(user_id.as_str());
                evicted.push(user_id.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Snapshot of every online user id, sorted.
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.entries.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
