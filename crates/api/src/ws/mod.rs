//! WebSocket infrastructure for real-time communication.
//!
//! Provides connection management, heartbeat monitoring, the HTTP upgrade
//! handler, and per-frame dispatch into the delivery layer.

mod dispatch;
mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{ws_handler, WsQuery};
pub use heartbeat::start_heartbeat;
pub use manager::{frame_message, RemovedConnection, WsManager};
