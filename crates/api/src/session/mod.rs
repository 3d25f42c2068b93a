//! Session attachment for persistent connections.
//!
//! - [`session`] -- [`Session`], one per WebSocket, holding the identity
//!   attached at handshake time.
//! - [`authenticator`] -- [`ConnectionAuthenticator`], which turns the
//!   handshake frame into an [`Identity`](parley_core::identity::Identity).

pub mod authenticator;
#[allow(clippy::module_inception)]
pub mod session;

pub use authenticator::{AuthError, ConnectionAuthenticator};
pub use session::{Session, SessionAttributes};
