//! Handshake authentication.
//!
//! Fails closed: a handshake that lacks a usable credential, carries one
//! that fails verification, or names a user the directory no longer knows is
//! rejected, and the caller tears the connection down.

use std::sync::Arc;

use parley_core::identity::Identity;
use parley_core::protocol::ClientFrame;
use parley_core::store::{UserDirectory, UserRecord};

use crate::auth::jwt::{bearer_token, verify_token, JwtConfig};
use crate::session::session::{Session, SessionAttributes};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No credential was presented on the handshake")]
    MissingCredential,

    #[error("Credential is invalid or expired")]
    InvalidOrExpiredCredential,

    #[error("Session already has an identity attached")]
    AlreadyAttached,
}

impl AuthError {
    /// Stable machine-readable code used in `error` frames and JSON bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::InvalidOrExpiredCredential => "INVALID_CREDENTIAL",
            AuthError::AlreadyAttached => "ALREADY_ATTACHED",
        }
    }
}

pub struct ConnectionAuthenticator {
    jwt: JwtConfig,
    users: Arc<dyn UserDirectory>,
}

impl ConnectionAuthenticator {
    pub fn new(jwt: JwtConfig, users: Arc<dyn UserDirectory>) -> Self {
        Self { jwt, users }
    }

    /// Resolve the identity carried by a handshake frame.
    ///
    /// The frame's `authorization` header wins; when it is absent the token
    /// captured at upgrade time is used. Any frame other than `connect`
    /// carries no credential.
    pub async fn authenticate(
        &self,
        frame: &ClientFrame,
        attrs: &SessionAttributes,
    ) -> Result<Identity, AuthError> {
        let ClientFrame::Connect { authorization } = frame else {
            return Err(AuthError::MissingCredential);
        };

        let token = match authorization.as_deref() {
            Some(header) => bearer_token(header).ok_or(AuthError::InvalidOrExpiredCredential)?,
            None => attrs
                .token
                .as_deref()
                .ok_or(AuthError::MissingCredential)?,
        };

        self.verify(token).await
    }

    /// Authenticate and attach the identity to `session`.
    pub async fn authenticate_session(
        &self,
        session: &Session,
        frame: &ClientFrame,
        attrs: &SessionAttributes,
    ) -> Result<Identity, AuthError> {
        if session.is_authenticated() {
            return Err(AuthError::AlreadyAttached);
        }
        let identity = self.authenticate(frame, attrs).await?;
        session.attach(identity.clone())?;
        tracing::debug!(
            conn_id = %session.conn_id(),
            user_id = %identity.user_id,
            "Session attached"
        );
        Ok(identity)
    }

    /// Verify a raw token and confirm the identity with the directory.
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        Ok(self.verify_account(token).await?.identity())
    }

    /// Verify a raw token and return the account it names.
    ///
    /// Also used by the HTTP extractor so both surfaces share one check. The
    /// returned record carries the directory's current role, not the one
    /// stamped into the token.
    pub async fn verify_account(&self, token: &str) -> Result<UserRecord, AuthError> {
        let claims = verify_token(token, &self.jwt).map_err(|e| {
            tracing::debug!(error = %e, "Credential verification failed");
            AuthError::InvalidOrExpiredCredential
        })?;
        let claimed = claims.identity();

        match self.users.find_user(&claimed.user_id).await {
            Ok(Some(user)) if user.identity() == claimed => Ok(user),
            Ok(_) => {
                tracing::warn!(
                    user_id = %claimed.user_id,
                    "Credential names an unknown or renamed user"
                );
                Err(AuthError::InvalidOrExpiredCredential)
            }
            Err(e) => {
                tracing::error!(user_id = %claimed.user_id, error = %e, "Identity lookup failed");
                Err(AuthError::InvalidOrExpiredCredential)
            }
        }
    }
}
