//! Repository for the `users` table.

use parley_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::user::UserRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, password_hash, role, online, last_seen, \
                       created_at, updated_at";

/// Provides account lookups and the presence mirror for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(
        pool: &PgPool,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, username, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// List every user, ordered by username.
    pub async fn list(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY username");
        sqlx::query_as::<_, UserRow>(&query).fetch_all(pool).await
    }

    pub async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Update the durable online flag. `last_seen` is kept when `None`.
    pub async fn set_presence(
        pool: &PgPool,
        id: &str,
        online: bool,
        last_seen: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                online = $2,
                last_seen = COALESCE($3, last_seen),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(online)
        .bind(last_seen)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Clear every online flag. Returns the number of rows changed.
    pub async fn reset_all_presence(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET online = false, updated_at = NOW() WHERE online")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
