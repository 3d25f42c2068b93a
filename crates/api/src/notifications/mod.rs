//! Presence fan-out.
//!
//! [`PresenceFanout`] subscribes to the event bus and relays every presence
//! change to all authenticated WebSocket sessions as a `presence` frame.

pub mod presence_fanout;

pub use presence_fanout::PresenceFanout;
