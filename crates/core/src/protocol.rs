//! WebSocket wire protocol.
//!
//! Frames are JSON text messages with an internally-tagged `"type"`
//! discriminator. The first client frame on a connection must be
//! [`ClientFrame::Connect`]; everything after it is tagged with the identity
//! attached during that handshake, never with ids supplied in the payload.

use serde::{Deserialize, Serialize};

use crate::call::{CallRecord, CallStatus, CallType};
use crate::chat::ChatMessage;
use crate::types::{CallId, MessageId, UserId};

/// Frames sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Session handshake carrying the bearer credential.
    #[serde(rename = "connect")]
    Connect {
        /// `Bearer <token>`. Falls back to the token captured at upgrade time.
        #[serde(default)]
        authorization: Option<String>,
    },

    #[serde(rename = "chat.send")]
    ChatSend {
        receiver_id: UserId,
        content: String,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
    },

    #[serde(rename = "chat.read")]
    ChatRead {
        sender_id: UserId,
        receiver_id: UserId,
        #[serde(default)]
        message_ids: Option<Vec<MessageId>>,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
    },

    #[serde(rename = "call.initiate")]
    CallInitiate {
        receiver_id: UserId,
        call_type: CallType,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
    },

    #[serde(rename = "call.end")]
    CallEnd {
        call_id: CallId,
        status: CallStatus,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
    },

    /// Application-level keepalive; refreshes presence.
    #[serde(rename = "ping")]
    Ping,
}

impl ClientFrame {
    pub fn is_handshake(&self) -> bool {
        matches!(self, ClientFrame::Connect { .. })
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Handshake accepted.
    #[serde(rename = "connected")]
    Connected { user_id: UserId, username: String },

    /// Live push of a message addressed to this session's user.
    #[serde(rename = "chat.message")]
    ChatMessage { message: ChatMessage },

    /// Acknowledgement to the sender that a message was persisted.
    #[serde(rename = "chat.sent")]
    ChatSent {
        message: ChatMessage,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },

    /// Relayed read receipt: `receiver_id` has read `message_ids`.
    #[serde(rename = "chat.receipt")]
    ChatReceipt {
        sender_id: UserId,
        receiver_id: UserId,
        message_ids: Vec<MessageId>,
    },

    /// Acknowledgement to the reader that read flags were updated.
    #[serde(rename = "chat.read.ok")]
    ChatReadOk {
        updated: usize,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },

    /// Live push of a call initiated towards this session's user.
    #[serde(rename = "call.incoming")]
    CallIncoming { call: CallRecord },

    /// Live push of a call that ended.
    #[serde(rename = "call.updated")]
    CallUpdated { call: CallRecord },

    /// Acknowledgement of `call.initiate` / `call.end`.
    #[serde(rename = "call.ack")]
    CallAck {
        call: CallRecord,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },

    /// Shared presence topic.
    #[serde(rename = "presence")]
    Presence { user_id: UserId, online: bool },

    #[serde(rename = "pong")]
    Pong,

    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
}

impl ServerFrame {
    pub fn error(code: &str, message: impl Into<String>, reference: Option<String>) -> Self {
        ServerFrame::Error {
            code: code.to_string(),
            message: message.into(),
            reference,
        }
    }
}
