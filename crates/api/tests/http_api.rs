//! Integration tests for the HTTP surface: health, accounts, chat, calls,
//! and presence, driven through the full middleware stack.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, post_json_auth};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let (state, _) = common::build_test_state();
    let response = get(common::build_test_app(state), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().get("x-request-id").is_some(),
        "Response must contain an x-request-id header"
    );

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
    assert_eq!(json["online_users"], 0);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (state, _) = common::build_test_state();
    let response = get(common::build_test_app(state), "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_then_login() {
    let (state, _) = common::build_test_state();

    let response = post_json(
        common::build_test_app(state.clone()),
        "/api/v1/auth/register",
        json!({"username": "alice", "email": "alice@example.com", "password": "hunter2hunter2"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = body_json(response).await;
    assert_eq!(registered["username"], "alice");
    assert!(registered["token"].as_str().is_some_and(|t| !t.is_empty()));

    let response = post_json(
        common::build_test_app(state.clone()),
        "/api/v1/auth/login",
        json!({"username": "alice", "password": "hunter2hunter2"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in = body_json(response).await;
    assert_eq!(logged_in["user_id"], registered["user_id"]);

    let response = post_json(
        common::build_test_app(state),
        "/api/v1/auth/login",
        json!({"username": "alice", "password": "wrong-password"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let (state, _) = common::build_test_state();
    common::create_user(&state, "alice").await;

    let response = post_json(
        common::build_test_app(state),
        "/api/v1/auth/register",
        json!({"username": "alice", "email": "other@example.com", "password": "long-enough-pw"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let (state, _) = common::build_test_state();
    let response = post_json(
        common::build_test_app(state),
        "/api/v1/auth/register",
        json!({"username": "alice", "email": "alice@example.com", "password": "short"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (state, _) = common::build_test_state();

    let response = get(common::build_test_app(state.clone()), "/api/v1/presence").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "MISSING_CREDENTIAL");

    let response = get_auth(common::build_test_app(state), "/api/v1/presence", "garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn logout_takes_user_offline() {
    let (state, _) = common::build_test_state();
    let (alice, token) = common::create_user(&state, "alice").await;
    let mut events = state.event_bus.subscribe();
    state.presence.connect(&alice.user_id);

    let response = post_json_auth(
        common::build_test_app(state.clone()),
        "/api/v1/auth/logout",
        &token,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!state.presence.is_online(&alice.user_id));

    let change = events.recv().await.unwrap();
    assert_eq!(change.user_id, alice.user_id);
    assert!(!change.online);
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_fetch_count_and_read() {
    let (state, _) = common::build_test_state();
    let (alice, alice_token) = common::create_user(&state, "alice").await;
    let (bob, bob_token) = common::create_user(&state, "bob").await;

    for body in ["first", "second"] {
        let response = post_json_auth(
            common::build_test_app(state.clone()),
            "/api/v1/chat/messages",
            &alice_token,
            json!({"receiver_id": bob.user_id, "content": body}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["sender_id"], alice.user_id.as_str());
        assert_eq!(json["data"]["read"], false);
    }

    let response = get_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/chat/unread/{}", alice.user_id),
        &bob_token,
    )
    .await;
    assert_eq!(body_json(response).await["data"]["count"], 2);

    let response = get_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/chat/conversations/{}", alice.user_id),
        &bob_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let conversation = body_json(response).await;
    let messages = conversation["data"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "first");
    assert_eq!(messages[1]["content"], "second");

    let first_id = messages[0]["id"].clone();
    let response = post_json_auth(
        common::build_test_app(state.clone()),
        "/api/v1/chat/read",
        &bob_token,
        json!({"sender_id": alice.user_id, "receiver_id": bob.user_id, "message_ids": [first_id]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["updated"], json!([first_id]));

    let response = get_auth(
        common::build_test_app(state),
        &format!("/api/v1/chat/unread/{}", alice.user_id),
        &bob_token,
    )
    .await;
    assert_eq!(body_json(response).await["data"]["count"], 1);
}

#[tokio::test]
async fn spoofed_read_is_forbidden() {
    let (state, _) = common::build_test_state();
    let (alice, _) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;
    let (_, carol_token) = common::create_user(&state, "carol").await;

    let response = post_json_auth(
        common::build_test_app(state),
        "/api/v1/chat/read",
        &carol_token,
        json!({"sender_id": alice.user_id, "receiver_id": bob.user_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "SPOOFED_RECEIPT");
}

#[tokio::test]
async fn message_to_unknown_user_is_404() {
    let (state, _) = common::build_test_state();
    let (_, token) = common::create_user(&state, "alice").await;

    let response = post_json_auth(
        common::build_test_app(state),
        "/api/v1/chat/messages",
        &token,
        json!({"receiver_id": "nobody", "content": "hello"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "UNKNOWN_RECIPIENT");
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[tokio::test]
async fn call_initiate_end_and_history() {
    let (state, _) = common::build_test_state();
    let (alice, alice_token) = common::create_user(&state, "alice").await;
    let (bob, bob_token) = common::create_user(&state, "bob").await;

    let response = post_json_auth(
        common::build_test_app(state.clone()),
        "/api/v1/calls",
        &alice_token,
        json!({"receiver_id": bob.user_id, "call_type": "VOICE"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let call = body_json(response).await["data"].clone();
    assert_eq!(call["status"], "MISSED");
    assert!(call["end_time"].is_null());
    let call_id = call["id"].as_str().unwrap().to_string();

    let response = post_json_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/calls/{call_id}/end"),
        &bob_token,
        json!({"status": "COMPLETED"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let ended = body_json(response).await["data"].clone();
    assert_eq!(ended["status"], "COMPLETED");
    assert!(ended["duration_ms"].as_i64().is_some_and(|d| d >= 0));

    let response = post_json_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/calls/{call_id}/end"),
        &alice_token,
        json!({"status": "FAILED"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CALL_ALREADY_ENDED");

    let response = get_auth(
        common::build_test_app(state.clone()),
        "/api/v1/calls/history",
        &alice_token,
    )
    .await;
    let history = body_json(response).await;
    assert_eq!(history["data"].as_array().unwrap().len(), 1);

    let response = get_auth(
        common::build_test_app(state),
        &format!("/api/v1/calls/history/{}", alice.user_id),
        &bob_token,
    )
    .await;
    let between = body_json(response).await;
    assert_eq!(between["data"][0]["id"], call_id.as_str());
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn presence_endpoints_reflect_presence_store() {
    let (state, _) = common::build_test_state();
    let (alice, token) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;
    state.presence.connect(&bob.user_id);

    let response = get_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/presence/{}", bob.user_id),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["online"], true);

    let response = get_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/presence/{}", alice.user_id),
        &token,
    )
    .await;
    assert_eq!(body_json(response).await["data"]["online"], false);

    let response = get_auth(common::build_test_app(state), "/api/v1/presence", &token).await;
    assert_eq!(body_json(response).await["data"], json!([bob.user_id]));
}

// ---------------------------------------------------------------------------
// User directory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn directory_resolves_handles_including_offline_users() {
    let (state, _) = common::build_test_state();
    let (_, token) = common::create_user(&state, "alice").await;
    let (bob, _) = common::create_user(&state, "bob").await;

    let response = get_auth(
        common::build_test_app(state.clone()),
        "/api/v1/users/by-username/bob",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], bob.user_id.as_str());
    assert_eq!(json["data"]["username"], "bob");
    assert_eq!(json["data"]["online"], false);
    assert!(json["data"].get("password_hash").is_none());

    state.presence.connect(&bob.user_id);
    let response = get_auth(
        common::build_test_app(state.clone()),
        &format!("/api/v1/users/{}", bob.user_id),
        &token,
    )
    .await;
    assert_eq!(body_json(response).await["data"]["online"], true);

    let response = get_auth(
        common::build_test_app(state.clone()),
        "/api/v1/users/by-username/nobody",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(common::build_test_app(state), "/api/v1/users/by-username/bob").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn directory_listing_is_admin_only() {
    let (state, _) = common::build_test_state();
    let (_, user_token) = common::create_user(&state, "alice").await;
    let (_, admin_token) = common::create_user_with_role(&state, "root", "admin").await;

    let response = get_auth(common::build_test_app(state.clone()), "/api/v1/users", &user_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(common::build_test_app(state), "/api/v1/users", &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let names: Vec<_> = body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alice", "root"]);
}
