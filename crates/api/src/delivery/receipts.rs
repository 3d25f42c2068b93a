//! Read-receipt coordination.

use std::sync::Arc;

use parley_core::chat::{ReadCriteria, ReadReceipt};
use parley_core::identity::Identity;
use parley_core::protocol::ServerFrame;
use parley_core::store::{MessageStore, StoreError};
use parley_core::types::MessageId;

use crate::delivery::push::LiveDelivery;

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// The caller is not the receiver named in the receipt.
    #[error("Only the recipient of these messages may mark them read")]
    SpoofedReceipt,

    #[error("Failed to update read state: {0}")]
    ReceiptPersistFailed(#[source] StoreError),
}

impl ReceiptError {
    pub fn code(&self) -> &'static str {
        match self {
            ReceiptError::SpoofedReceipt => "SPOOFED_RECEIPT",
            ReceiptError::ReceiptPersistFailed(_) => "PERSISTENCE_FAILURE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptResult {
    /// Ids whose read flag flipped in this call.
    pub updated: Vec<MessageId>,
    /// Whether the original sender was sent a `chat.receipt`.
    pub notified: bool,
}

pub struct ReadReceiptCoordinator {
    messages: Arc<dyn MessageStore>,
    delivery: LiveDelivery,
}

impl ReadReceiptCoordinator {
    pub fn new(messages: Arc<dyn MessageStore>, delivery: LiveDelivery) -> Self {
        Self { messages, delivery }
    }

    /// Mark messages from `receipt.sender_id` to `caller` as read.
    ///
    /// A receipt whose `receiver_id` is not the caller is refused before any
    /// write. Once the read flags are committed, relaying the receipt to the
    /// sender is best effort and never turns the call into a failure.
    pub async fn mark_read(
        &self,
        receipt: &ReadReceipt,
        caller: &Identity,
    ) -> Result<ReceiptResult, ReceiptError> {
        if receipt.receiver_id != caller.user_id {
            tracing::warn!(
                caller_id = %caller.user_id,
                claimed_receiver_id = %receipt.receiver_id,
                sender_id = %receipt.sender_id,
                "Spoofed read receipt refused"
            );
            return Err(ReceiptError::SpoofedReceipt);
        }

        let criteria = ReadCriteria {
            sender_id: receipt.sender_id.clone(),
            receiver_id: receipt.receiver_id.clone(),
            scope: receipt.scope(),
        };
        let updated = self
            .messages
            .mark_read(&criteria)
            .await
            .map_err(ReceiptError::ReceiptPersistFailed)?;
        tracing::debug!(
            sender_id = %receipt.sender_id,
            receiver_id = %receipt.receiver_id,
            updated = updated.len(),
            "Messages marked read"
        );

        if updated.is_empty() {
            return Ok(ReceiptResult {
                updated,
                notified: false,
            });
        }

        let frame = ServerFrame::ChatReceipt {
            sender_id: receipt.sender_id.clone(),
            receiver_id: receipt.receiver_id.clone(),
            message_ids: updated.clone(),
        };
        let notified = self.delivery.deliver(&receipt.sender_id, &frame).await;

        Ok(ReceiptResult { updated, notified })
    }
}
