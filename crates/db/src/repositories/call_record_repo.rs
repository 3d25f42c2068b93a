//! Repository for the `call_records` table.

use parley_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::call_record::CallRecordRow;

const COLUMNS: &str =
    "id, caller_id, receiver_id, call_type, status, start_time, end_time, duration_ms";

pub struct CallRecordRepo;

impl CallRecordRepo {
    pub async fn create(
        pool: &PgPool,
        id: &str,
        caller_id: &str,
        receiver_id: &str,
        call_type: &str,
        status: &str,
        start_time: Timestamp,
    ) -> Result<CallRecordRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO call_records (id, caller_id, receiver_id, call_type, status, start_time)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CallRecordRow>(&query)
            .bind(id)
            .bind(caller_id)
            .bind(receiver_id)
            .bind(call_type)
            .bind(status)
            .bind(start_time)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<CallRecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM call_records WHERE id = $1");
        sqlx::query_as::<_, CallRecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set end time, duration, and status on a call that has not ended.
    ///
    /// Returns `None` if the call does not exist or already ended.
    pub async fn complete(
        pool: &PgPool,
        id: &str,
        end_time: Timestamp,
        duration_ms: i64,
        status: &str,
    ) -> Result<Option<CallRecordRow>, sqlx::Error> {
        let query = format!(
            "UPDATE call_records SET
                end_time = $2,
                duration_ms = $3,
                status = $4
             WHERE id = $1 AND end_time IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CallRecordRow>(&query)
            .bind(id)
            .bind(end_time)
            .bind(duration_ms)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Calls where the user is caller or receiver, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<CallRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM call_records
             WHERE caller_id = $1 OR receiver_id = $1
             ORDER BY start_time DESC, id DESC"
        );
        sqlx::query_as::<_, CallRecordRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_between(
        pool: &PgPool,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<CallRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM call_records
             WHERE (caller_id = $1 AND receiver_id = $2)
                OR (caller_id = $2 AND receiver_id = $1)
             ORDER BY start_time DESC, id DESC"
        );
        sqlx::query_as::<_, CallRecordRow>(&query)
            .bind(user_a)
            .bind(user_b)
            .fetch_all(pool)
            .await
    }
}
