//! Durable-store collaborator interfaces.
//!
//! The presence-and-delivery core never talks to a database directly; it
//! consumes these traits. `parley-db` provides the Postgres and in-memory
//! implementations.

use async_trait::async_trait;
use serde::Serialize;

use crate::call::{CallCompletion, CallRecord, NewCallRecord};
use crate::chat::{ChatMessage, NewChatMessage, ReadCriteria};
use crate::identity::Identity;
use crate::types::{MessageId, Timestamp, UserId};

/// Failure reported by a durable-store implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint violated (e.g. duplicate username).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection, query, serialization).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub online: bool,
    pub last_seen: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id.clone(), self.username.clone())
    }
}

/// Public view of a user (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub online: bool,
    pub last_seen: Option<Timestamp>,
}

impl From<&UserRecord> for UserSummary {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            online: u.online,
            last_seen: u.last_seen,
        }
    }
}

/// Input for creating a user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Identity resolution and the durable presence mirror.
///
/// This is the single place where id ↔ username lookups happen.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create_user(&self, input: NewUser) -> StoreResult<UserRecord>;

    async fn find_user(&self, id: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    async fn user_exists(&self, id: &str) -> StoreResult<bool>;

    /// Every account, ordered by username.
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>>;

    /// Write the durable `online` flag; `last_seen` is only overwritten when
    /// `Some`.
    async fn set_presence(
        &self,
        id: &str,
        online: bool,
        last_seen: Option<Timestamp>,
    ) -> StoreResult<()>;

    /// Clear every durable `online` flag.
    ///
    /// Run at startup: no session survives a restart, so any flag still set
    /// was left behind by a process that stopped without announcing.
    /// Returns how many users were reset.
    async fn reset_presence(&self) -> StoreResult<u64>;

    /// Identifier → handle reverse lookup.
    async fn resolve_identity(&self, id: &str) -> StoreResult<Option<Identity>> {
        Ok(self.find_user(id).await?.map(|u| u.identity()))
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message with `read = false`; the store assigns the id.
    async fn save_message(&self, input: NewChatMessage) -> StoreResult<ChatMessage>;

    async fn find_message(&self, id: &str) -> StoreResult<Option<ChatMessage>>;

    /// Both directions between two users, oldest first.
    async fn find_conversation(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<ChatMessage>>;

    /// Unread messages from `sender_id` to `receiver_id`, oldest first.
    async fn find_unread(&self, sender_id: &str, receiver_id: &str) -> StoreResult<Vec<ChatMessage>>;

    /// Flip `read` to true on every unread message matching `criteria`.
    ///
    /// Returns the ids that changed. Messages outside the exact
    /// sender/receiver pair are never touched, even when listed by id.
    async fn mark_read(&self, criteria: &ReadCriteria) -> StoreResult<Vec<MessageId>>;
}

#[async_trait]
pub trait CallStore: Send + Sync {
    /// Persist a new call with the initial `Missed` status.
    async fn save_call(&self, input: NewCallRecord) -> StoreResult<CallRecord>;

    async fn find_call(&self, id: &str) -> StoreResult<Option<CallRecord>>;

    /// Apply the end-of-call fields if the call has not ended yet.
    ///
    /// Returns `None` when the call does not exist or already has an end time.
    async fn complete_call(
        &self,
        id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Option<CallRecord>>;

    /// Calls where `user_id` is either party, newest first.
    async fn calls_for_user(&self, user_id: &str) -> StoreResult<Vec<CallRecord>>;

    /// Calls between two users in either direction, newest first.
    async fn calls_between(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<CallRecord>>;
}

/// Liveness probe used by the health endpoint.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}
