use std::sync::OnceLock;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use parley_core::identity::Identity;

use crate::session::authenticator::AuthError;

/// One established persistent connection.
///
/// The identity slot is written once at handshake and never reassigned. A
/// session without an identity must not have any frame other than the
/// handshake processed on it.
#[derive(Debug)]
pub struct Session {
    conn_id: String,
    identity: OnceLock<Identity>,
}

impl Session {
    pub fn new(conn_id: impl Into<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            identity: OnceLock::new(),
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.get().is_some()
    }

    /// Attach the identity resolved at handshake.
    ///
    /// Fails with [`AuthError::AlreadyAttached`] if one is already set; the
    /// original identity is kept.
    pub fn attach(&self, identity: Identity) -> Result<&Identity, AuthError> {
        self.identity
            .set(identity)
            .map_err(|_| AuthError::AlreadyAttached)?;
        self.identity.get().ok_or(AuthError::AlreadyAttached)
    }
}

/// Values captured during the HTTP upgrade, before the first frame.
///
/// Browsers cannot set headers on a WebSocket handshake frame, so the
/// credential can instead ride on the upgrade request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAttributes {
    /// Raw bearer token (no scheme prefix).
    pub token: Option<String>,
}

impl SessionAttributes {
    /// Capture the token from the `?token=` query parameter, falling back to
    /// the upgrade request's `Authorization: Bearer` header.
    pub fn from_upgrade(query_token: Option<String>, headers: &HeaderMap) -> Self {
        let token = query_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(crate::auth::jwt::bearer_token)
                    .map(str::to_string)
            });
        Self { token }
    }
}
