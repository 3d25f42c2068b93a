use std::sync::Arc;

use parley_core::store::{CallStore, MessageStore, StoreHealth, UserDirectory};
use parley_events::EventBus;

use crate::config::ServerConfig;
use crate::delivery::{LiveDelivery, MessageRouter, ReadReceiptCoordinator};
use crate::presence::{PresenceNotifier, PresenceStore};
use crate::session::ConnectionAuthenticator;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// User accounts and the durable presence mirror.
    pub users: Arc<dyn UserDirectory>,
    pub messages: Arc<dyn MessageStore>,
    pub calls: Arc<dyn CallStore>,
    pub store_health: Arc<dyn StoreHealth>,
    /// Who is online right now.
    pub presence: Arc<PresenceStore>,
    pub notifier: Arc<PresenceNotifier>,
    pub authenticator: Arc<ConnectionAuthenticator>,
    pub router: Arc<MessageRouter>,
    pub receipts: Arc<ReadReceiptCoordinator>,
    /// WebSocket connection manager; also the live-push mechanism.
    pub ws_manager: Arc<WsManager>,
    /// Shared presence topic.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire every component around one store implementation.
    pub fn new<S>(config: ServerConfig, store: Arc<S>) -> Self
    where
        S: UserDirectory + MessageStore + CallStore + StoreHealth + 'static,
    {
        let users: Arc<dyn UserDirectory> = store.clone();
        let messages: Arc<dyn MessageStore> = store.clone();
        let calls: Arc<dyn CallStore> = store.clone();
        let store_health: Arc<dyn StoreHealth> = store;

        let event_bus = Arc::new(EventBus::default());
        let presence = Arc::new(PresenceStore::new());
        let ws_manager = Arc::new(WsManager::new());
        let notifier = Arc::new(PresenceNotifier::new(
            Arc::clone(&event_bus),
            Arc::clone(&users),
        ));
        let authenticator = Arc::new(ConnectionAuthenticator::new(
            config.jwt.clone(),
            Arc::clone(&users),
        ));

        let delivery = LiveDelivery::new(
            Arc::clone(&users),
            Arc::clone(&presence),
            ws_manager.clone(),
        );
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&users),
            Arc::clone(&messages),
            Arc::clone(&calls),
            delivery.clone(),
        ));
        let receipts = Arc::new(ReadReceiptCoordinator::new(Arc::clone(&messages), delivery));

        Self {
            config: Arc::new(config),
            users,
            messages,
            calls,
            store_health,
            presence,
            notifier,
            authenticator,
            router,
            receipts,
            ws_manager,
            event_bus,
        }
    }
}
