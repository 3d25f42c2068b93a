use parley_core::chat::ChatMessage;
use parley_core::types::Timestamp;
use sqlx::FromRow;

/// Row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub sent_at: Timestamp,
    pub read: bool,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        ChatMessage {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            timestamp: row.sent_at,
            read: row.read,
        }
    }
}
