//! Persist-then-push delivery of chat, call, and read-receipt events.
//!
//! - [`push`] -- the [`LivePush`] seam and [`LiveDelivery`], which decides
//!   whether an already-persisted event goes out over a live session.
//! - [`router`] -- [`MessageRouter`] for chat messages and call signaling.
//! - [`receipts`] -- [`ReadReceiptCoordinator`] for `chat.read`.
//!
//! Durable writes always complete before any push is attempted. Push
//! failures are logged and swallowed: the event stays retrievable from the
//! store.

pub mod push;
pub mod receipts;
pub mod router;

pub use push::{LiveDelivery, LivePush, PushError};
pub use receipts::{ReadReceiptCoordinator, ReceiptError, ReceiptResult};
pub use router::{MessageRouter, RouteError, Routed};
