//! In-process presence tracking.
//!
//! - [`store`] -- [`PresenceStore`], the authoritative user-id → last-activity
//!   map. Answers "is this user reachable right now".
//! - [`notifier`] -- [`PresenceNotifier`], which announces transitions on
//!   the shared presence topic and mirrors them to durable storage.

pub mod notifier;
pub mod store;

pub use notifier::PresenceNotifier;
pub use store::PresenceStore;

use parley_core::types::now;

/// Mark `user_id` online, announcing only if they were not online before.
///
/// The announcement is made while the user's entry is locked, so the
/// published events and durable writes for one user follow the same order
/// as the store's transitions. Returns whether an announcement was made.
pub fn connect_and_announce(
    store: &PresenceStore,
    notifier: &PresenceNotifier,
    user_id: &str,
) -> bool {
    store.connect_then(user_id, now(), || {
        notifier.announce(user_id, true);
    })
}

/// The single disconnect path shared by session close, logout, and the
/// sweeper.
///
/// Only the caller that actually removes the entry announces, so a user is
/// announced offline at most once however many paths race.
pub fn disconnect_and_announce(
    store: &PresenceStore,
    notifier: &PresenceNotifier,
    user_id: &str,
) -> bool {
    store.disconnect_then(user_id, || {
        notifier.announce(user_id, false);
    })
}

/// Take every online user offline, announcing each one.
///
/// Used on shutdown, when sessions are torn down without running their own
/// disconnect path. Returns how many users were announced.
pub fn disconnect_all_and_announce(store: &PresenceStore, notifier: &PresenceNotifier) -> usize {
    store
        .online_users()
        .iter()
        .filter(|user_id| disconnect_and_announce(store, notifier, user_id))
        .count()
}
