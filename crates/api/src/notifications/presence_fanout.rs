use std::sync::Arc;

use parley_core::presence::PresenceChange;
use parley_core::protocol::ServerFrame;
use tokio::sync::broadcast;

use crate::ws::{frame_message, WsManager};

/// Relays the shared presence topic to WebSocket clients.
///
/// Delivery is fire-and-forget: a lagging receiver skips events and a
/// closed connection is simply not reached.
pub struct PresenceFanout {
    ws_manager: Arc<WsManager>,
}

impl PresenceFanout {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the relay loop.
    ///
    /// Exits when the channel is closed (i.e. the
    /// [`EventBus`](parley_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PresenceChange>) {
        loop {
            match receiver.recv().await {
                Ok(change) => self.relay(&change).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Presence fan-out lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, presence fan-out shutting down");
                    break;
                }
            }
        }
    }

    async fn relay(&self, change: &PresenceChange) {
        let frame = ServerFrame::Presence {
            user_id: change.user_id.clone(),
            online: change.online,
        };
        match frame_message(&frame) {
            Ok(message) => {
                let reached = self.ws_manager.broadcast(message).await;
                tracing::debug!(
                    user_id = %change.user_id,
                    online = change.online,
                    reached,
                    "Presence change relayed"
                );
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode presence frame"),
        }
    }
}
