//! Per-frame handling for authenticated sessions.
//!
//! Every frame is tagged with the session's attached identity; ids in the
//! payload never stand in for the caller.

use parley_core::chat::ReadReceipt;
use parley_core::identity::Identity;
use parley_core::protocol::{ClientFrame, ServerFrame};

use crate::delivery::{ReceiptError, RouteError};
use crate::session::AuthError;
use crate::state::AppState;
use crate::ws::handler::send_frame;

/// Handle one inbound frame and queue the reply on the originating
/// connection.
pub(crate) async fn handle_frame(
    state: AppState,
    conn_id: String,
    identity: Identity,
    frame: ClientFrame,
) {
    let reply = dispatch(&state, &identity, frame).await;
    send_frame(&state, &conn_id, &reply).await;
}

pub(crate) async fn dispatch(state: &AppState, identity: &Identity, frame: ClientFrame) -> ServerFrame {
    match frame {
        ClientFrame::Connect { .. } => {
            let err = AuthError::AlreadyAttached;
            ServerFrame::error(err.code(), err.to_string(), None)
        }

        ClientFrame::Ping => ServerFrame::Pong,

        ClientFrame::ChatSend {
            receiver_id,
            content,
            reference,
        } => match state.router.route(identity, &receiver_id, content).await {
            Ok(routed) => ServerFrame::ChatSent {
                message: routed.event,
                reference,
            },
            Err(e) => route_error(e, reference),
        },

        ClientFrame::ChatRead {
            sender_id,
            receiver_id,
            message_ids,
            reference,
        } => {
            let receipt = ReadReceipt {
                sender_id,
                receiver_id,
                message_ids,
            };
            match state.receipts.mark_read(&receipt, identity).await {
                Ok(result) => ServerFrame::ChatReadOk {
                    updated: result.updated.len(),
                    reference,
                },
                Err(e) => receipt_error(e, reference),
            }
        }

        ClientFrame::CallInitiate {
            receiver_id,
            call_type,
            reference,
        } => match state
            .router
            .initiate_call(identity, &receiver_id, call_type)
            .await
        {
            Ok(routed) => ServerFrame::CallAck {
                call: routed.event,
                reference,
            },
            Err(e) => route_error(e, reference),
        },

        ClientFrame::CallEnd {
            call_id,
            status,
            reference,
        } => match state.router.end_call(identity, &call_id, status).await {
            Ok(routed) => ServerFrame::CallAck {
                call: routed.event,
                reference,
            },
            Err(e) => route_error(e, reference),
        },
    }
}

fn route_error(err: RouteError, reference: Option<String>) -> ServerFrame {
    let message = match &err {
        RouteError::Persistence(inner) => {
            tracing::error!(error = %inner, "Failed to persist routed event");
            "The event could not be stored".to_string()
        }
        other => other.to_string(),
    };
    ServerFrame::error(err.code(), message, reference)
}

fn receipt_error(err: ReceiptError, reference: Option<String>) -> ServerFrame {
    let message = match &err {
        ReceiptError::ReceiptPersistFailed(inner) => {
            tracing::error!(error = %inner, "Failed to persist read receipt");
            "Read state could not be updated".to_string()
        }
        other => other.to_string(),
    };
    ServerFrame::error(err.code(), message, reference)
}
