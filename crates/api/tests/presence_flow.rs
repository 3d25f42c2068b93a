//! End-to-end presence and delivery flow through the wired `AppState`.
//!
//! Live sessions are simulated by registering channels with the
//! `WsManager`, exactly as the WebSocket handler does after a handshake.

mod common;

use std::time::Duration;

use axum::extract::ws::Message;
use parley_api::background::presence_sweep::sweep_once;
use parley_api::presence::{connect_and_announce, disconnect_and_announce};
use parley_api::state::AppState;
use parley_core::chat::ReadReceipt;
use parley_core::identity::Identity;
use parley_core::protocol::ServerFrame;
use parley_core::store::{MessageStore, UserDirectory};
use parley_core::types::now;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// Register a live session for `identity` and bring them online.
async fn open_session(
    state: &AppState,
    conn_id: &str,
    identity: &Identity,
) -> UnboundedReceiver<Message> {
    let rx = state.ws_manager.add(conn_id.to_string()).await;
    state.ws_manager.attach(conn_id, identity.clone()).await;
    connect_and_announce(&state.presence, &state.notifier, &identity.user_id);
    rx
}

fn decode(msg: Message) -> ServerFrame {
    match msg {
        Message::Text(t) => serde_json::from_str(t.as_str()).unwrap(),
        other => panic!("Expected a text frame, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: connect, send to offline user, late connect, fetch, read, receipt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_delivery_then_read_receipt() {
    let (state, store) = common::build_test_state();
    let (alice, _) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;
    let mut presence_events = state.event_bus.subscribe();

    // A connects: online broadcast fires.
    let mut alice_rx = open_session(&state, "conn-alice", &alice).await;
    let change = presence_events.recv().await.unwrap();
    assert_eq!(change.user_id, alice.user_id);
    assert!(change.online);

    // A sends to offline B: persisted, not pushed, unread count goes up.
    let routed = state
        .router
        .route(&alice, &bob.user_id, "are you there?".into())
        .await
        .unwrap();
    assert!(!routed.pushed);
    let unread = store.find_unread(&alice.user_id, &bob.user_id).await.unwrap();
    assert_eq!(unread.len(), 1);

    // B connects and fetches the conversation.
    let _bob_rx = open_session(&state, "conn-bob", &bob).await;
    let conversation = store
        .find_conversation(&bob.user_id, &alice.user_id)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].id, routed.event.id);
    assert!(!conversation[0].read);

    // B marks everything from A read; A is online and gets the receipt.
    let receipt = ReadReceipt {
        sender_id: alice.user_id.clone(),
        receiver_id: bob.user_id.clone(),
        message_ids: None,
    };
    let result = state.receipts.mark_read(&receipt, &bob).await.unwrap();
    assert_eq!(result.updated, vec![routed.event.id.clone()]);
    assert!(result.notified);

    assert!(store
        .find_unread(&alice.user_id, &bob.user_id)
        .await
        .unwrap()
        .is_empty());

    let pushed = decode(alice_rx.recv().await.unwrap());
    assert_eq!(
        pushed,
        ServerFrame::ChatReceipt {
            sender_id: alice.user_id.clone(),
            receiver_id: bob.user_id.clone(),
            message_ids: vec![routed.event.id],
        }
    );
}

// ---------------------------------------------------------------------------
// Test: an online recipient receives the message on their session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn online_recipient_receives_live_push() {
    let (state, _store) = common::build_test_state();
    let (alice, _) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;
    let mut bob_rx = open_session(&state, "conn-bob", &bob).await;

    let routed = state
        .router
        .route(&alice, &bob.user_id, "ping".into())
        .await
        .unwrap();
    assert!(routed.pushed);

    let frame = decode(bob_rx.recv().await.unwrap());
    assert_eq!(
        frame,
        ServerFrame::ChatMessage {
            message: routed.event
        }
    );
}

// ---------------------------------------------------------------------------
// Test: recipient's session closes mid-route; message still retrievable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_session_does_not_lose_message() {
    let (state, store) = common::build_test_state();
    let (alice, _) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;

    // Presence still says online, but the session's channel is gone.
    let bob_rx = open_session(&state, "conn-bob", &bob).await;
    drop(bob_rx);

    let routed = state
        .router
        .route(&alice, &bob.user_id, "persisted anyway".into())
        .await
        .unwrap();
    assert!(!routed.pushed);

    let conversation = store
        .find_conversation(&alice.user_id, &bob.user_id)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].content, "persisted anyway");
}

// ---------------------------------------------------------------------------
// Test: spoofed receipt through the wired coordinator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spoofed_receipt_is_refused() {
    let (state, store) = common::build_test_state();
    let (alice, _) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;
    let (carol, _) = common::create_user(&state, "carol").await;

    let sent = state
        .router
        .route(&alice, &bob.user_id, "for bob only".into())
        .await
        .unwrap()
        .event;

    let receipt = ReadReceipt {
        sender_id: alice.user_id.clone(),
        receiver_id: bob.user_id.clone(),
        message_ids: Some(vec![sent.id.clone()]),
    };
    let err = state.receipts.mark_read(&receipt, &carol).await.unwrap_err();
    assert_eq!(err.code(), "SPOOFED_RECEIPT");
    assert!(!store.find_message(&sent.id).await.unwrap().unwrap().read);
}

// ---------------------------------------------------------------------------
// Test: sweep eviction and explicit disconnect announce offline once total
// ---------------------------------------------------------------------------

#[tokio::test]
async fn eviction_and_disconnect_announce_offline_once() {
    let (state, store) = common::build_test_state();
    let (alice, _) = common::create_user(&state, "alice").await;
    let mut events = state.event_bus.subscribe();

    let t0 = now();
    state.presence.connect_at(&alice.user_id, t0);
    let stale = Duration::from_secs(60);

    let evicted = sweep_once(
        &state.presence,
        &state.notifier,
        t0 + chrono::Duration::seconds(61),
        stale,
    );
    assert_eq!(evicted, vec![alice.user_id.clone()]);

    // The session then closes; disconnect finds nothing left to remove.
    assert!(!disconnect_and_announce(
        &state.presence,
        &state.notifier,
        &alice.user_id
    ));

    let change = events.recv().await.unwrap();
    assert!(!change.online);
    assert_matches::assert_matches!(events.try_recv(), Err(TryRecvError::Empty));

    // The durable mirror catches up asynchronously.
    let mut mirrored = false;
    for _ in 0..50 {
        let user = store.find_user(&alice.user_id).await.unwrap().unwrap();
        if user.last_seen.is_some() && !user.online {
            mirrored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(mirrored, "offline flag and last_seen should be persisted");
}
