//! Parley domain layer.
//!
//! Zero internal dependencies: the store crate, the event bus, and the API
//! server all build on the types, wire protocol, and collaborator traits
//! defined here.

pub mod call;
pub mod chat;
pub mod error;
pub mod identity;
pub mod presence;
pub mod protocol;
pub mod roles;
pub mod store;
pub mod types;
