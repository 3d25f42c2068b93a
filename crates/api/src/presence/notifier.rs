//! Presence announcements.

use std::sync::Arc;

use parley_core::presence::PresenceChange;
use parley_core::store::UserDirectory;
use parley_core::types::now;
use parley_events::EventBus;
use tokio::sync::{mpsc, oneshot};

/// Work item for the durable-write task.
enum PresenceWrite {
    Apply(PresenceChange),
    /// Answered once every write queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Announces online/offline transitions.
///
/// Each announcement has two independent effects: a fire-and-forget publish
/// on the shared presence topic, and a durable write of the `online` flag
/// (plus `last_seen` when going offline). Durable writes go through one
/// FIFO queue drained by a single task, so they reach storage in the order
/// they were announced. A failure in one effect never blocks or fails the
/// other.
///
/// Must be created inside a Tokio runtime.
pub struct PresenceNotifier {
    bus: Arc<EventBus>,
    writes: mpsc::UnboundedSender<PresenceWrite>,
}

impl PresenceNotifier {
    pub fn new(bus: Arc<EventBus>, users: Arc<dyn UserDirectory>) -> Self {
        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(users, rx));
        Self { bus, writes }
    }

    /// Announce a transition for `user_id`.
    ///
    /// Never blocks, so it is safe to call while a presence entry is locked.
    pub fn announce(&self, user_id: &str, online: bool) -> PresenceChange {
        let change = if online {
            PresenceChange::online(user_id, now())
        } else {
            PresenceChange::offline(user_id, now())
        };

        let receivers = self.bus.publish(change.clone());
        tracing::info!(user_id = %change.user_id, online, receivers, "Presence changed");

        if self.writes.send(PresenceWrite::Apply(change.clone())).is_err() {
            tracing::warn!(user_id = %change.user_id, "Presence writer stopped, durable flag not updated");
        }
        change
    }

    /// Wait until every durable write announced so far has been applied.
    pub async fn flushed(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writes.send(PresenceWrite::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Apply queued presence writes one at a time until every sender is gone.
async fn run_writer(users: Arc<dyn UserDirectory>, mut rx: mpsc::UnboundedReceiver<PresenceWrite>) {
    while let Some(write) = rx.recv().await {
        match write {
            PresenceWrite::Apply(change) => {
                if let Err(e) = users
                    .set_presence(&change.user_id, change.online, change.last_seen())
                    .await
                {
                    tracing::warn!(
                        user_id = %change.user_id,
                        online = change.online,
                        error = %e,
                        "Failed to persist presence flag",
                    );
                }
            }
            PresenceWrite::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Presence writer stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parley_core::store::{NewUser, StoreResult, UserRecord};
    use parley_core::types::Timestamp;
    use parley_db::MemoryStore;

    use super::*;

    async fn setup() -> (Arc<MemoryStore>, Arc<EventBus>, PresenceNotifier, String) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "x".into(),
                role: "user".into(),
            })
            .await
            .unwrap();
        let bus = Arc::new(EventBus::default());
        let notifier = PresenceNotifier::new(Arc::clone(&bus), store.clone());
        (store, bus, notifier, user.id)
    }

    #[tokio::test]
    async fn announce_publishes_and_persists() {
        let (store, bus, notifier, user_id) = setup().await;
        let mut rx = bus.subscribe();

        notifier.announce(&user_id, true);
        notifier.flushed().await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, user_id);
        assert!(event.online);
        let user = store.find_user(&user_id).await.unwrap().unwrap();
        assert!(user.online);
        assert!(user.last_seen.is_none());

        notifier.announce(&user_id, false);
        notifier.flushed().await;
        let event = rx.recv().await.unwrap();
        assert!(!event.online);
        let user = store.find_user(&user_id).await.unwrap().unwrap();
        assert!(!user.online);
        assert_eq!(user.last_seen, Some(event.at));
    }

    #[tokio::test]
    async fn persist_failure_does_not_suppress_broadcast() {
        let (store, bus, notifier, user_id) = setup().await;
        let mut rx = bus.subscribe();
        store.set_failing(true);

        notifier.announce(&user_id, true);
        notifier.flushed().await;
        let event = rx.recv().await.unwrap();
        assert!(event.online);

        store.set_failing(false);
        let user = store.find_user(&user_id).await.unwrap().unwrap();
        assert!(!user.online, "failed write must leave the durable flag untouched");
    }

    #[tokio::test]
    async fn announce_without_subscribers_still_persists() {
        let (store, _bus, notifier, user_id) = setup().await;
        notifier.announce(&user_id, true);
        notifier.flushed().await;
        assert!(store.find_user(&user_id).await.unwrap().unwrap().online);
    }

    /// Directory whose offline writes are slow, so a later online write
    /// would overtake them if writes were not ordered.
    struct SlowOfflineWrites(Arc<MemoryStore>);

    #[async_trait]
    impl UserDirectory for SlowOfflineWrites {
        async fn create_user(&self, input: NewUser) -> StoreResult<UserRecord> {
            self.0.create_user(input).await
        }

        async fn find_user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
            self.0.find_user(id).await
        }

        async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
            self.0.find_user_by_username(username).await
        }

        async fn user_exists(&self, id: &str) -> StoreResult<bool> {
            self.0.user_exists(id).await
        }

        async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
            self.0.list_users().await
        }

        async fn set_presence(
            &self,
            id: &str,
            online: bool,
            last_seen: Option<Timestamp>,
        ) -> StoreResult<()> {
            if !online {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.0.set_presence(id, online, last_seen).await
        }

        async fn reset_presence(&self) -> StoreResult<u64> {
            self.0.reset_presence().await
        }
    }

    #[tokio::test]
    async fn quick_reconnect_leaves_durable_flag_online() {
        let (store, _bus, _notifier, user_id) = setup().await;
        let bus = Arc::new(EventBus::default());
        let notifier = PresenceNotifier::new(bus, Arc::new(SlowOfflineWrites(store.clone())));
        let presence = crate::presence::PresenceStore::new();

        crate::presence::connect_and_announce(&presence, &notifier, &user_id);
        crate::presence::disconnect_and_announce(&presence, &notifier, &user_id);
        crate::presence::connect_and_announce(&presence, &notifier, &user_id);
        notifier.flushed().await;

        assert!(presence.is_online(&user_id));
        let user = store.find_user(&user_id).await.unwrap().unwrap();
        assert!(user.online, "durable flag must match the final in-memory state");
        assert!(user.last_seen.is_some());
    }
}
