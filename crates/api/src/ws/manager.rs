use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use parley_core::identity::Identity;
use parley_core::protocol::ServerFrame;
use parley_core::types::{now, Timestamp};
use tokio::sync::{mpsc, RwLock};

use crate::delivery::push::{LivePush, PushError};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Set once the handshake frame authenticates.
    pub identity: Option<Identity>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// What [`WsManager::remove`] took out of the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedConnection {
    pub identity: Option<Identity>,
    /// Live connections the same user still has after this removal.
    pub remaining_for_user: usize,
}

/// Serialize a server frame into a WebSocket text message.
pub fn frame_message(frame: &ServerFrame) -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(frame)?;
    Ok(Message::Text(json.into()))
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Connections are keyed by connection id;
/// live pushes address them by the attached identity's handle.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new, not yet authenticated connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            identity: None,
            sender: tx,
            connected_at: now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Attach the authenticated identity to a registered connection.
    ///
    /// Returns `false` if the connection is gone.
    pub async fn attach(&self, conn_id: &str, identity: Identity) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.identity = Some(identity);
                true
            }
            None => false,
        }
    }

    /// Remove a connection by its ID.
    ///
    /// The remaining-session count is taken under the same lock as the
    /// removal. Returns `None` if the connection was already removed (by
    /// logout or shutdown).
    pub async fn remove(&self, conn_id: &str) -> Option<RemovedConnection> {
        let mut conns = self.connections.write().await;
        let removed = conns.remove(conn_id)?;
        let remaining_for_user = match &removed.identity {
            Some(identity) => conns
                .values()
                .filter(|c| {
                    c.identity
                        .as_ref()
                        .is_some_and(|i| i.user_id == identity.user_id)
                })
                .count(),
            None => 0,
        };
        Some(RemovedConnection {
            identity: removed.identity,
            remaining_for_user,
        })
    }

    pub async fn contains(&self, conn_id: &str) -> bool {
        self.connections.read().await.contains_key(conn_id)
    }

    /// Number of authenticated connections belonging to `user_id`.
    pub async fn sessions_for_user(&self, user_id: &str) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.identity.as_ref().is_some_and(|i| i.user_id == user_id))
            .count()
    }

    /// Send a message to one connection. Returns `false` if it is gone.
    pub async fn send_to_conn(&self, conn_id: &str, message: Message) -> bool {
        match self.connections.read().await.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Broadcast a message to every authenticated connection.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    /// Returns the number of connections the message was queued on.
    pub async fn broadcast(&self, message: Message) -> usize {
        let conns = self.connections.read().await;
        conns
            .values()
            .filter(|c| c.identity.is_some())
            .filter(|c| c.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Close and unregister every connection of `user_id`.
    ///
    /// Returns how many connections were closed. Their receive loops see the
    /// connection missing from the map and skip the disconnect path.
    pub async fn close_user(&self, user_id: &str) -> usize {
        let mut conns = self.connections.write().await;
        let before = conns.len();
        conns.retain(|_, conn| {
            let owned = conn
                .identity
                .as_ref()
                .is_some_and(|i| i.user_id == user_id);
            if owned {
                let _ = conn.sender.send(Message::Close(None));
            }
            !owned
        });
        before - conns.len()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Pongs coming back count as activity for the presence entry.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LivePush for WsManager {
    async fn push_to_handle(&self, handle: &str, frame: &ServerFrame) -> Result<usize, PushError> {
        let message = frame_message(frame).map_err(|e| PushError::Encode(e.to_string()))?;

        let conns = self.connections.read().await;
        let mut matched = 0;
        let mut delivered = 0;
        for conn in conns.values() {
            if conn.identity.as_ref().is_some_and(|i| i.username == handle) {
                matched += 1;
                if conn.sender.send(message.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        match (matched, delivered) {
            (0, _) => Err(PushError::NoLiveSession(handle.to_string())),
            (_, 0) => Err(PushError::ChannelClosed(handle.to_string())),
            _ => Ok(delivered),
        }
    }
}
