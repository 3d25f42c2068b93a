//! Chat and call-signaling routing.

use std::sync::Arc;

use parley_core::call::{CallCompletion, CallRecord, CallStatus, CallType, NewCallRecord};
use parley_core::chat::{validate_content, ChatMessage, NewChatMessage};
use parley_core::identity::Identity;
use parley_core::protocol::ServerFrame;
use parley_core::store::{CallStore, MessageStore, StoreError, UserDirectory};
use parley_core::types::{now, CallId, UserId};

use crate::delivery::push::LiveDelivery;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(UserId),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Call not found: {0}")]
    CallNotFound(CallId),

    #[error("Only a participant can end this call")]
    NotCallParticipant,

    #[error("Call {0} has already ended")]
    CallAlreadyEnded(CallId),

    #[error("Failed to persist event: {0}")]
    Persistence(#[from] StoreError),
}

impl RouteError {
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::UnknownRecipient(_) => "UNKNOWN_RECIPIENT",
            RouteError::InvalidPayload(_) => "VALIDATION_ERROR",
            RouteError::CallNotFound(_) => "CALL_NOT_FOUND",
            RouteError::NotCallParticipant => "NOT_CALL_PARTICIPANT",
            RouteError::CallAlreadyEnded(_) => "CALL_ALREADY_ENDED",
            RouteError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

/// A persisted event and whether it also went out live.
#[derive(Debug, Clone)]
pub struct Routed<T> {
    pub event: T,
    /// `false` when the recipient was offline or the push failed; the event
    /// is still in the store either way.
    pub pushed: bool,
}

/// Persists chat and call events, then pushes them to online recipients.
///
/// The sender is always an attached session identity, so only the recipient
/// is validated.
pub struct MessageRouter {
    users: Arc<dyn UserDirectory>,
    messages: Arc<dyn MessageStore>,
    calls: Arc<dyn CallStore>,
    delivery: LiveDelivery,
}

impl MessageRouter {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        messages: Arc<dyn MessageStore>,
        calls: Arc<dyn CallStore>,
        delivery: LiveDelivery,
    ) -> Self {
        Self {
            users,
            messages,
            calls,
            delivery,
        }
    }

    async fn ensure_recipient(&self, receiver_id: &str) -> Result<(), RouteError> {
        if self.users.user_exists(receiver_id).await? {
            Ok(())
        } else {
            Err(RouteError::UnknownRecipient(receiver_id.to_string()))
        }
    }

    /// Send a chat message from `sender` to `receiver_id`.
    pub async fn route(
        &self,
        sender: &Identity,
        receiver_id: &str,
        content: String,
    ) -> Result<Routed<ChatMessage>, RouteError> {
        validate_content(&content).map_err(RouteError::InvalidPayload)?;
        self.ensure_recipient(receiver_id).await?;

        let message = self
            .messages
            .save_message(NewChatMessage {
                sender_id: sender.user_id.clone(),
                receiver_id: receiver_id.to_string(),
                content,
                timestamp: now(),
            })
            .await?;
        tracing::debug!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "Chat message persisted"
        );

        let frame = ServerFrame::ChatMessage {
            message: message.clone(),
        };
        let pushed = self.delivery.deliver(receiver_id, &frame).await;

        Ok(Routed {
            event: message,
            pushed,
        })
    }

    /// Record a new call from `caller` with the initial `MISSED` status and
    /// ring the recipient if online.
    pub async fn initiate_call(
        &self,
        caller: &Identity,
        receiver_id: &str,
        call_type: CallType,
    ) -> Result<Routed<CallRecord>, RouteError> {
        if caller.user_id == receiver_id {
            return Err(RouteError::InvalidPayload("Cannot call yourself".into()));
        }
        self.ensure_recipient(receiver_id).await?;

        let call = self
            .calls
            .save_call(NewCallRecord::initiate(
                caller.user_id.clone(),
                receiver_id.to_string(),
                call_type,
                now(),
            ))
            .await?;
        tracing::info!(
            call_id = %call.id,
            caller_id = %call.caller_id,
            receiver_id = %call.receiver_id,
            call_type = call.call_type.as_str(),
            "Call initiated"
        );

        let frame = ServerFrame::CallIncoming { call: call.clone() };
        let pushed = self.delivery.deliver(receiver_id, &frame).await;

        Ok(Routed {
            event: call,
            pushed,
        })
    }

    /// End a call on behalf of one of its participants.
    ///
    /// End time and duration are written exactly once; a second end is
    /// rejected with [`RouteError::CallAlreadyEnded`].
    pub async fn end_call(
        &self,
        caller: &Identity,
        call_id: &str,
        status: CallStatus,
    ) -> Result<Routed<CallRecord>, RouteError> {
        let call = self
            .calls
            .find_call(call_id)
            .await?
            .ok_or_else(|| RouteError::CallNotFound(call_id.to_string()))?;

        if !call.is_participant(&caller.user_id) {
            tracing::warn!(
                call_id,
                user_id = %caller.user_id,
                "Non-participant attempted to end a call"
            );
            return Err(RouteError::NotCallParticipant);
        }
        if call.is_ended() {
            return Err(RouteError::CallAlreadyEnded(call.id));
        }

        let completion = CallCompletion::at(call.start_time, now(), status);
        let ended = self
            .calls
            .complete_call(call_id, completion)
            .await?
            // Lost a race with the other participant's end.
            .ok_or_else(|| RouteError::CallAlreadyEnded(call_id.to_string()))?;
        tracing::info!(
            call_id = %ended.id,
            status = ended.status.as_str(),
            duration_ms = ended.duration_ms,
            "Call ended"
        );

        let counterpart = ended.counterpart(&caller.user_id).to_string();
        let frame = ServerFrame::CallUpdated {
            call: ended.clone(),
        };
        let pushed = self.delivery.deliver(&counterpart, &frame).await;

        Ok(Routed {
            event: ended,
            pushed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use assert_matches::assert_matches;
    use parley_core::store::{NewUser, UserRecord};
    use parley_db::MemoryStore;

    use super::*;
    use crate::delivery::push::testing::RecordingPush;
    use crate::presence::PresenceStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        presence: Arc<PresenceStore>,
        push: Arc<RecordingPush>,
        router: MessageRouter,
        alice: UserRecord,
        bob: UserRecord,
    }

    async fn user(store: &MemoryStore, name: &str) -> UserRecord {
        store
            .create_user(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "x".into(),
                role: "user".into(),
            })
            .await
            .unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let presence = Arc::new(PresenceStore::new());
        let push = Arc::new(RecordingPush::default());
        let delivery = LiveDelivery::new(store.clone(), Arc::clone(&presence), push.clone());
        let router = MessageRouter::new(store.clone(), store.clone(), store.clone(), delivery);
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        Fixture {
            store,
            presence,
            push,
            router,
            alice,
            bob,
        }
    }

    #[tokio::test]
    async fn offline_recipient_gets_persisted_message_only() {
        let f = fixture().await;
        let routed = f
            .router
            .route(&f.alice.identity(), &f.bob.id, "hi bob".into())
            .await
            .unwrap();

        assert!(!routed.pushed);
        assert!(!routed.event.read);
        assert_eq!(f.push.count(), 0);
        let unread = f.store.find_unread(&f.alice.id, &f.bob.id).await.unwrap();
        assert_eq!(unread, vec![routed.event]);
    }

    #[tokio::test]
    async fn online_recipient_is_pushed_by_handle() {
        let f = fixture().await;
        f.presence.connect(&f.bob.id);

        let routed = f
            .router
            .route(&f.alice.identity(), &f.bob.id, "hi bob".into())
            .await
            .unwrap();

        assert!(routed.pushed);
        let frames = f.push.frames_for("bob");
        assert_eq!(
            frames,
            vec![ServerFrame::ChatMessage {
                message: routed.event
            }]
        );
    }

    #[tokio::test]
    async fn push_failure_keeps_message_retrievable() {
        let f = fixture().await;
        f.presence.connect(&f.bob.id);
        f.push.failing.store(true, Ordering::SeqCst);

        let routed = f
            .router
            .route(&f.alice.identity(), &f.bob.id, "still here".into())
            .await
            .unwrap();

        assert!(!routed.pushed);
        let conversation = f
            .store
            .find_conversation(&f.bob.id, &f.alice.id)
            .await
            .unwrap();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation[0].content, "still here");
    }

    #[tokio::test]
    async fn unknown_recipient_is_rejected_without_persisting() {
        let f = fixture().await;
        let err = f
            .router
            .route(&f.alice.identity(), "nobody", "hello?".into())
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::UnknownRecipient(id) if id == "nobody");
        assert!(f
            .store
            .find_conversation(&f.alice.id, "nobody")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let f = fixture().await;
        let err = f
            .router
            .route(&f.alice.identity(), &f.bob.id, "   ".into())
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::InvalidPayload(_));
    }

    #[tokio::test]
    async fn persistence_failure_is_surfaced_and_nothing_is_pushed() {
        let f = fixture().await;
        f.presence.connect(&f.bob.id);
        f.store.set_failing(true);

        let err = f
            .router
            .route(&f.alice.identity(), &f.bob.id, "lost".into())
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::Persistence(_));
        assert_eq!(f.push.count(), 0);
    }

    #[tokio::test]
    async fn call_lifecycle_sets_duration_once() {
        let f = fixture().await;
        f.presence.connect(&f.bob.id);
        f.presence.connect(&f.alice.id);

        let initiated = f
            .router
            .initiate_call(&f.alice.identity(), &f.bob.id, CallType::Video)
            .await
            .unwrap();
        assert_eq!(initiated.event.status, CallStatus::Missed);
        assert!(initiated.event.end_time.is_none());
        assert!(initiated.pushed);
        assert_matches!(
            f.push.frames_for("bob").as_slice(),
            [ServerFrame::CallIncoming { .. }]
        );

        let ended = f
            .router
            .end_call(&f.bob.identity(), &initiated.event.id, CallStatus::Completed)
            .await
            .unwrap();
        let call = ended.event;
        assert_eq!(call.status, CallStatus::Completed);
        let end = call.end_time.unwrap();
        assert_eq!(
            call.duration_ms,
            Some((end - call.start_time).num_milliseconds())
        );
        assert_matches!(
            f.push.frames_for("alice").as_slice(),
            [ServerFrame::CallUpdated { .. }]
        );

        let err = f
            .router
            .end_call(&f.alice.identity(), &call.id, CallStatus::Failed)
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::CallAlreadyEnded(_));
        let stored = f.store.find_call(&call.id).await.unwrap().unwrap();
        assert_eq!(stored.end_time, Some(end));
        assert_eq!(stored.status, CallStatus::Completed);
    }

    #[tokio::test]
    async fn only_participants_end_calls() {
        let f = fixture().await;
        let mallory = user(&f.store, "mallory").await;
        let call = f
            .router
            .initiate_call(&f.alice.identity(), &f.bob.id, CallType::Voice)
            .await
            .unwrap()
            .event;

        let err = f
            .router
            .end_call(&mallory.identity(), &call.id, CallStatus::Rejected)
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::NotCallParticipant);

        let err = f
            .router
            .end_call(&f.alice.identity(), "no-such-call", CallStatus::Rejected)
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::CallNotFound(_));
    }

    #[tokio::test]
    async fn self_calls_are_rejected() {
        let f = fixture().await;
        let err = f
            .router
            .initiate_call(&f.alice.identity(), &f.alice.id, CallType::Voice)
            .await
            .unwrap_err();
        assert_matches!(err, RouteError::InvalidPayload(_));
    }
}
