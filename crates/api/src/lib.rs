//! Parley API server library.
//!
//! Exposes the presence-and-delivery core (presence store, notifier, message
//! router, read-receipt coordinator, liveness sweeper), the WebSocket session
//! layer, and the HTTP surface so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod presence;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
pub mod ws;
