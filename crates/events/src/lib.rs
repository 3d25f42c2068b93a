//! Parley event bus.
//!
//! [`EventBus`] is the shared presence topic: an in-process
//! publish/subscribe hub backed by `tokio::sync::broadcast`. Publishing is
//! fire-and-forget; slow subscribers lose the oldest events rather than
//! blocking publishers.

pub mod bus;

pub use bus::EventBus;
