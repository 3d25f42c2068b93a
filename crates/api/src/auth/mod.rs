//! Credential service and password primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- issuing and verifying the bearer tokens presented on HTTP
//!   requests and on the WebSocket handshake frame.

pub mod jwt;
pub mod password;
