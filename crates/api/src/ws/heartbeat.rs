use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients.
///
/// The task runs until aborted; `main` aborts it during shutdown. Clients
/// answer with Pong frames, which refresh their presence entries.
pub fn start_heartbeat(ws_manager: Arc<WsManager>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            let count = ws_manager.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            ws_manager.ping_all().await;
        }
    })
}
