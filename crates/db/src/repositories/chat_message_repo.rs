//! Repository for the `chat_messages` table.

use parley_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::chat_message::ChatMessageRow;

const COLUMNS: &str = "id, sender_id, receiver_id, content, sent_at, read";

pub struct ChatMessageRepo;

impl ChatMessageRepo {
    /// Insert an unread message, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        id: &str,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        sent_at: Timestamp,
    ) -> Result<ChatMessageRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages (id, sender_id, receiver_id, content, sent_at, read)
             VALUES ($1, $2, $3, $4, $5, false)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(id)
            .bind(sender_id)
            .bind(receiver_id)
            .bind(content)
            .bind(sent_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ChatMessageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chat_messages WHERE id = $1");
        sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All messages exchanged between two users, oldest first.
    pub async fn find_conversation(
        pool: &PgPool,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<ChatMessageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages
             WHERE (sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1)
             ORDER BY sent_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(user_a)
            .bind(user_b)
            .fetch_all(pool)
            .await
    }

    pub async fn find_unread(
        pool: &PgPool,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Vec<ChatMessageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages
             WHERE sender_id = $1 AND receiver_id = $2 AND read = false
             ORDER BY sent_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(sender_id)
            .bind(receiver_id)
            .fetch_all(pool)
            .await
    }

    /// Mark every unread message of the pair as read. Returns the changed ids.
    pub async fn mark_all_read(
        pool: &PgPool,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE chat_messages SET read = true
             WHERE sender_id = $1 AND receiver_id = $2 AND read = false
             RETURNING id",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_all(pool)
        .await
    }

    /// Mark the listed messages as read, restricted to the pair.
    pub async fn mark_ids_read(
        pool: &PgPool,
        sender_id: &str,
        receiver_id: &str,
        ids: &[String],
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE chat_messages SET read = true
             WHERE sender_id = $1 AND receiver_id = $2 AND read = false
               AND id = ANY($3)
             RETURNING id",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
