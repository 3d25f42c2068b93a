use std::sync::Arc;

use async_trait::async_trait;
use parley_core::protocol::ServerFrame;
use parley_core::store::UserDirectory;

use crate::presence::PresenceStore;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("No live session for handle {0}")]
    NoLiveSession(String),

    #[error("Every session channel for handle {0} is closed")]
    ChannelClosed(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Addressed delivery to the live sessions of one handle.
#[async_trait]
pub trait LivePush: Send + Sync {
    /// Queue `frame` on every live session of `handle`.
    ///
    /// Returns how many sessions accepted it.
    async fn push_to_handle(&self, handle: &str, frame: &ServerFrame) -> Result<usize, PushError>;
}

/// The "is the target online, and if so push" step shared by the router and
/// the read-receipt coordinator.
#[derive(Clone)]
pub struct LiveDelivery {
    users: Arc<dyn UserDirectory>,
    presence: Arc<PresenceStore>,
    push: Arc<dyn LivePush>,
}

impl LiveDelivery {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        presence: Arc<PresenceStore>,
        push: Arc<dyn LivePush>,
    ) -> Self {
        Self {
            users,
            presence,
            push,
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.presence.is_online(user_id)
    }

    /// Push `frame` to `user_id` if they are online.
    ///
    /// Makes at most one attempt. Returns whether at least one session
    /// accepted the frame; every failure is logged here and never escalated.
    pub async fn deliver(&self, user_id: &str, frame: &ServerFrame) -> bool {
        if !self.presence.is_online(user_id) {
            tracing::debug!(user_id, "Recipient offline, leaving event for later fetch");
            return false;
        }

        let identity = match self.users.resolve_identity(user_id).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::warn!(user_id, "Online user has no identity in the directory");
                return false;
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Identity lookup failed, skipping push");
                return false;
            }
        };

        match self.push.push_to_handle(&identity.username, frame).await {
            Ok(sessions) => {
                tracing::debug!(user_id, sessions, "Live push delivered");
                sessions > 0
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Live push failed");
                false
            }
        }
    }
}
