//! Resolved user identity attached to an authenticated session.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A user reference resolved from a verified credential.
///
/// `user_id` keys everything persisted; `username` is the handle used to
/// address live pushes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}
