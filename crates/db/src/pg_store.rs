//! Postgres-backed implementation of the `parley-core` store traits.

use async_trait::async_trait;
use parley_core::call::{CallCompletion, CallRecord, CallStatus, NewCallRecord};
use parley_core::chat::{ChatMessage, NewChatMessage, ReadCriteria, ReadScope};
use parley_core::store::{
    CallStore, MessageStore, NewUser, StoreError, StoreHealth, StoreResult, UserDirectory,
    UserRecord,
};
use parley_core::types::{MessageId, Timestamp};

use crate::models::call_record::CallRecordRow;
use crate::repositories::{CallRecordRepo, ChatMessageRepo, UserRepo};
use crate::{new_id, DbPool};

/// Store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a sqlx error into the store-level error.
///
/// Unique violations (PostgreSQL code 23505) become `Conflict`.
fn store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            return StoreError::Conflict(format!("Duplicate value violates {constraint}"));
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}

fn to_call(row: CallRecordRow) -> StoreResult<CallRecord> {
    CallRecord::try_from(row).map_err(StoreError::Backend)
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn create_user(&self, input: NewUser) -> StoreResult<UserRecord> {
        let row = UserRepo::create(
            &self.pool,
            &new_id(),
            &input.username,
            &input.email,
            &input.password_hash,
            &input.role,
        )
        .await
        .map_err(store_err)?;
        Ok(row.into())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        let row = UserRepo::find_by_id(&self.pool, id).await.map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let row = UserRepo::find_by_username(&self.pool, username)
            .await
            .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn user_exists(&self, id: &str) -> StoreResult<bool> {
        UserRepo::exists(&self.pool, id).await.map_err(store_err)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let rows = UserRepo::list(&self.pool).await.map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_presence(
        &self,
        id: &str,
        online: bool,
        last_seen: Option<Timestamp>,
    ) -> StoreResult<()> {
        UserRepo::set_presence(&self.pool, id, online, last_seen)
            .await
            .map_err(store_err)
    }

    async fn reset_presence(&self) -> StoreResult<u64> {
        UserRepo::reset_all_presence(&self.pool)
            .await
            .map_err(store_err)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn save_message(&self, input: NewChatMessage) -> StoreResult<ChatMessage> {
        let row = ChatMessageRepo::create(
            &self.pool,
            &new_id(),
            &input.sender_id,
            &input.receiver_id,
            &input.content,
            input.timestamp,
        )
        .await
        .map_err(store_err)?;
        Ok(row.into())
    }

    async fn find_message(&self, id: &str) -> StoreResult<Option<ChatMessage>> {
        let row = ChatMessageRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_conversation(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<ChatMessage>> {
        let rows = ChatMessageRepo::find_conversation(&self.pool, user_a, user_b)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_unread(&self, sender_id: &str, receiver_id: &str) -> StoreResult<Vec<ChatMessage>> {
        let rows = ChatMessageRepo::find_unread(&self.pool, sender_id, receiver_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_read(&self, criteria: &ReadCriteria) -> StoreResult<Vec<MessageId>> {
        let result = match &criteria.scope {
            ReadScope::AllUnread => {
                ChatMessageRepo::mark_all_read(&self.pool, &criteria.sender_id, &criteria.receiver_id)
                    .await
            }
            ReadScope::Only(ids) => {
                ChatMessageRepo::mark_ids_read(
                    &self.pool,
                    &criteria.sender_id,
                    &criteria.receiver_id,
                    ids,
                )
                .await
            }
        };
        result.map_err(store_err)
    }
}

#[async_trait]
impl CallStore for PgStore {
    async fn save_call(&self, input: NewCallRecord) -> StoreResult<CallRecord> {
        let row = CallRecordRepo::create(
            &self.pool,
            &new_id(),
            &input.caller_id,
            &input.receiver_id,
            input.call_type.as_str(),
            CallStatus::INITIAL.as_str(),
            input.start_time,
        )
        .await
        .map_err(store_err)?;
        to_call(row)
    }

    async fn find_call(&self, id: &str) -> StoreResult<Option<CallRecord>> {
        CallRecordRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(to_call)
            .transpose()
    }

    async fn complete_call(
        &self,
        id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Option<CallRecord>> {
        CallRecordRepo::complete(
            &self.pool,
            id,
            completion.end_time,
            completion.duration_ms,
            completion.status.as_str(),
        )
        .await
        .map_err(store_err)?
        .map(to_call)
        .transpose()
    }

    async fn calls_for_user(&self, user_id: &str) -> StoreResult<Vec<CallRecord>> {
        CallRecordRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(to_call)
            .collect()
    }

    async fn calls_between(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<CallRecord>> {
        CallRecordRepo::list_between(&self.pool, user_a, user_b)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(to_call)
            .collect()
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(store_err)
    }
}
