//! Chat message and read-receipt types.

use serde::{Deserialize, Serialize};

use crate::types::{MessageId, Timestamp, UserId};

/// Maximum accepted message body length, in characters.
pub const MAX_CONTENT_CHARS: usize = 4000;

/// A persisted one-to-one chat message.
///
/// `read` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: Timestamp,
    pub read: bool,
}

/// Input for persisting a new message. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: Timestamp,
}

/// A request (or relayed notice) that messages from `sender_id` to
/// `receiver_id` have been read.
///
/// An absent or empty `message_ids` covers every unread message of the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ids: Option<Vec<MessageId>>,
}

impl ReadReceipt {
    /// Which messages of the pair this receipt covers.
    pub fn scope(&self) -> ReadScope {
        match &self.message_ids {
            Some(ids) if !ids.is_empty() => ReadScope::Only(ids.clone()),
            _ => ReadScope::AllUnread,
        }
    }
}

/// Selection of messages to flip to read within one sender/receiver pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    AllUnread,
    Only(Vec<MessageId>),
}

/// Criteria for the bulk conditional read-flag update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCriteria {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub scope: ReadScope,
}

/// Validate a message body before it is persisted.
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message content must not be empty".to_string());
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(format!(
            "Message content must be at most {MAX_CONTENT_CHARS} characters, got {chars}"
        ));
    }
    Ok(())
}
