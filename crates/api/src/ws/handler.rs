use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use parley_core::identity::Identity;
use parley_core::protocol::{ClientFrame, ServerFrame};
use serde::Deserialize;

use crate::presence::{connect_and_announce, disconnect_and_announce};
use crate::session::{Session, SessionAttributes};
use crate::state::AppState;
use crate::ws::dispatch;
use crate::ws::manager::frame_message;

/// How long to wait for queued frames to flush before dropping a rejected
/// connection.
const REJECT_FLUSH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Bearer token for clients that cannot send headers.
    pub token: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The credential, if any, is captured from the upgrade request as a session
/// attribute; the connection is still unauthenticated until its first frame.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let attrs = SessionAttributes::from_upgrade(query.token, &headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, attrs))
}

/// Why a connection did not get past its handshake.
enum Rejection {
    /// The peer went away; nothing to send.
    Gone,
    /// Tell the peer why, then close.
    Refused(ServerFrame),
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Requires a `connect` frame and attaches the identity.
///   4. Processes inbound frames, each on its own task.
///   5. Runs the disconnect path when the user's last session closes.
async fn handle_socket(socket: WebSocket, state: AppState, attrs: SessionAttributes) {
    let session = Session::new(uuid::Uuid::new_v4().to_string());
    let conn_id = session.conn_id().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = state.ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // --- Handshake ---
    let identity = match handshake(&state, &session, &attrs, &mut stream).await {
        Ok(identity) => identity,
        Err(rejection) => {
            if let Rejection::Refused(frame) = rejection {
                tracing::info!(conn_id = %conn_id, ?frame, "WebSocket handshake refused");
                send_frame(&state, &conn_id, &frame).await;
                state.ws_manager.send_to_conn(&conn_id, Message::Close(None)).await;
            }
            // Dropping the manager's sender lets the send task drain and exit.
            state.ws_manager.remove(&conn_id).await;
            if tokio::time::timeout(REJECT_FLUSH_TIMEOUT, &mut send_task)
                .await
                .is_err()
            {
                send_task.abort();
            }
            tracing::info!(conn_id = %conn_id, "WebSocket disconnected before authenticating");
            return;
        }
    };

    send_frame(
        &state,
        &conn_id,
        &ServerFrame::Connected {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
        },
    )
    .await;
    state.ws_manager.attach(&conn_id, identity.clone()).await;
    connect_and_announce(&state.presence, &state.notifier, &identity.user_id);
    tracing::info!(conn_id = %conn_id, user_id = %identity.user_id, "WebSocket session authenticated");

    // Receiver loop: process inbound messages.
    while let Some(result) = stream.next().await {
        // Closed server-side (logout or shutdown); the disconnect path ran there.
        if !state.ws_manager.contains(&conn_id).await {
            break;
        }
        match result {
            Ok(Message::Text(text)) => {
                refresh_presence(&state, &identity);
                match serde_json::from_str::<ClientFrame>(text.as_str()) {
                    Ok(frame) => {
                        tokio::spawn(dispatch::handle_frame(
                            state.clone(),
                            conn_id.clone(),
                            identity.clone(),
                            frame,
                        ));
                    }
                    Err(e) => {
                        let frame = ServerFrame::error("INVALID_FRAME", e.to_string(), None);
                        send_frame(&state, &conn_id, &frame).await;
                    }
                }
            }
            Ok(Message::Pong(_)) | Ok(Message::Ping(_)) => {
                tracing::trace!(conn_id = %conn_id, "Keepalive received");
                refresh_presence(&state, &identity);
            }
            Ok(Message::Binary(_)) => {
                let frame = ServerFrame::error("INVALID_FRAME", "Binary frames are not supported", None);
                send_frame(&state, &conn_id, &frame).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    send_task.abort();
    if let Some(removed) = state.ws_manager.remove(&conn_id).await {
        if removed.remaining_for_user == 0 {
            disconnect_and_announce(&state.presence, &state.notifier, &identity.user_id);
        } else {
            tracing::debug!(
                user_id = %identity.user_id,
                remaining = removed.remaining_for_user,
                "User still has live sessions"
            );
        }
    }
    tracing::info!(conn_id = %conn_id, user_id = %identity.user_id, "WebSocket disconnected");
}

/// Wait for the first text frame and authenticate it.
async fn handshake(
    state: &AppState,
    session: &Session,
    attrs: &SessionAttributes,
    stream: &mut SplitStream<WebSocket>,
) -> Result<Identity, Rejection> {
    let first = tokio::time::timeout(
        state.config.presence.handshake_timeout,
        first_client_frame(stream),
    )
    .await
    .map_err(|_| {
        Rejection::Refused(ServerFrame::error(
            "HANDSHAKE_TIMEOUT",
            "No connect frame received in time",
            None,
        ))
    })??;

    state
        .authenticator
        .authenticate_session(session, &first, attrs)
        .await
        .map_err(|e| Rejection::Refused(ServerFrame::error(e.code(), e.to_string(), None)))
}

async fn first_client_frame(stream: &mut SplitStream<WebSocket>) -> Result<ClientFrame, Rejection> {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                return serde_json::from_str(text.as_str()).map_err(|e| {
                    Rejection::Refused(ServerFrame::error("INVALID_FRAME", e.to_string(), None))
                });
            }
            Ok(Message::Binary(_)) => {
                return Err(Rejection::Refused(ServerFrame::error(
                    "INVALID_FRAME",
                    "Binary frames are not supported",
                    None,
                )));
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return Err(Rejection::Gone),
        }
    }
    Err(Rejection::Gone)
}

/// Refresh the user's presence entry on inbound activity.
///
/// If the sweeper evicted the entry while this session stayed open, the
/// user is reconnected and announced online again.
fn refresh_presence(state: &AppState, identity: &Identity) {
    if !state.presence.touch(&identity.user_id)
        && connect_and_announce(&state.presence, &state.notifier, &identity.user_id)
    {
        tracing::info!(user_id = %identity.user_id, "Live session re-registered after eviction");
    }
}

pub(crate) async fn send_frame(state: &AppState, conn_id: &str, frame: &ServerFrame) {
    match frame_message(frame) {
        Ok(message) => {
            if !state.ws_manager.send_to_conn(conn_id, message).await {
                tracing::debug!(conn_id, "Connection gone before frame could be queued");
            }
        }
        Err(e) => tracing::error!(conn_id, error = %e, "Failed to encode server frame"),
    }
}
