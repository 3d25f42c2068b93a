//! In-process store implementing the same traits as [`PgStore`](crate::PgStore).
//!
//! Used by the test suites and by dev runs without `DATABASE_URL`. Each
//! operation takes a single lock, which gives the per-row atomicity the core
//! expects from a durable store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parley_core::call::{CallCompletion, CallRecord, CallStatus, NewCallRecord};
use parley_core::chat::{ChatMessage, NewChatMessage, ReadCriteria, ReadScope};
use parley_core::store::{
    CallStore, MessageStore, NewUser, StoreError, StoreHealth, StoreResult, UserDirectory,
    UserRecord,
};
use parley_core::types::{MessageId, Timestamp};
use tokio::sync::RwLock;

use crate::new_id;

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    /// Insertion order doubles as the tie-break for equal timestamps.
    messages: Vec<ChatMessage>,
    calls: HashMap<String, CallRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("memory store is failing writes".into()));
        }
        Ok(())
    }
}

fn is_pair(msg: &ChatMessage, sender_id: &str, receiver_id: &str) -> bool {
    msg.sender_id == sender_id && msg.receiver_id == receiver_id
}

fn sort_newest_first(calls: &mut [CallRecord]) {
    calls.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, input: NewUser) -> StoreResult<UserRecord> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == input.username) {
            return Err(StoreError::Conflict(
                "Duplicate value violates uq_users_username".into(),
            ));
        }
        if tables.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Conflict(
                "Duplicate value violates uq_users_email".into(),
            ));
        }
        let user = UserRecord {
            id: new_id(),
            username: input.username,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            online: false,
            last_seen: None,
            created_at: parley_core::types::now(),
        };
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.read().await.users.contains_key(id))
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn set_presence(
        &self,
        id: &str,
        online: bool,
        last_seen: Option<Timestamp>,
    ) -> StoreResult<()> {
        self.check_writable()?;
        if let Some(user) = self.tables.write().await.users.get_mut(id) {
            user.online = online;
            if last_seen.is_some() {
                user.last_seen = last_seen;
            }
        }
        Ok(())
    }

    async fn reset_presence(&self) -> StoreResult<u64> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let mut reset = 0;
        for user in tables.users.values_mut().filter(|u| u.online) {
            user.online = false;
            reset += 1;
        }
        Ok(reset)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save_message(&self, input: NewChatMessage) -> StoreResult<ChatMessage> {
        self.check_writable()?;
        let message = ChatMessage {
            id: new_id(),
            sender_id: input.sender_id,
            receiver_id: input.receiver_id,
            content: input.content,
            timestamp: input.timestamp,
            read: false,
        };
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn find_message(&self, id: &str) -> StoreResult<Option<ChatMessage>> {
        let tables = self.tables.read().await;
        Ok(tables.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn find_conversation(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<ChatMessage>> {
        let tables = self.tables.read().await;
        let mut out: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| is_pair(m, user_a, user_b) || is_pair(m, user_b, user_a))
            .cloned()
            .collect();
        out.sort_by_key(|m| m.timestamp);
        Ok(out)
    }

    async fn find_unread(&self, sender_id: &str, receiver_id: &str) -> StoreResult<Vec<ChatMessage>> {
        let tables = self.tables.read().await;
        let mut out: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| is_pair(m, sender_id, receiver_id) && !m.read)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.timestamp);
        Ok(out)
    }

    async fn mark_read(&self, criteria: &ReadCriteria) -> StoreResult<Vec<MessageId>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let mut changed = Vec::new();
        for msg in tables.messages.iter_mut() {
            if msg.read || !is_pair(msg, &criteria.sender_id, &criteria.receiver_id) {
                continue;
            }
            let selected = match &criteria.scope {
                ReadScope::AllUnread => true,
                ReadScope::Only(ids) => ids.contains(&msg.id),
            };
            if selected {
                msg.read = true;
                changed.push(msg.id.clone());
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn save_call(&self, input: NewCallRecord) -> StoreResult<CallRecord> {
        self.check_writable()?;
        let call = CallRecord {
            id: new_id(),
            caller_id: input.caller_id,
            receiver_id: input.receiver_id,
            call_type: input.call_type,
            status: CallStatus::INITIAL,
            start_time: input.start_time,
            end_time: None,
            duration_ms: None,
        };
        self.tables
            .write()
            .await
            .calls
            .insert(call.id.clone(), call.clone());
        Ok(call)
    }

    async fn find_call(&self, id: &str) -> StoreResult<Option<CallRecord>> {
        Ok(self.tables.read().await.calls.get(id).cloned())
    }

    async fn complete_call(
        &self,
        id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Option<CallRecord>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        match tables.calls.get_mut(id) {
            Some(call) if !call.is_ended() => {
                call.end_time = Some(completion.end_time);
                call.duration_ms = Some(completion.duration_ms);
                call.status = completion.status;
                Ok(Some(call.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn calls_for_user(&self, user_id: &str) -> StoreResult<Vec<CallRecord>> {
        let tables = self.tables.read().await;
        let mut out: Vec<CallRecord> = tables
            .calls
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    async fn calls_between(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<CallRecord>> {
        let tables = self.tables.read().await;
        let mut out: Vec<CallRecord> = tables
            .calls
            .values()
            .filter(|c| c.is_participant(user_a) && c.is_participant(user_b))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
