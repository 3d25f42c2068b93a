use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::error::CoreError;
use parley_core::store::StoreError;
use serde_json::json;

use crate::delivery::receipts::ReceiptError;
use crate::delivery::router::RouteError;
use crate::session::authenticator::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, the presence-and-delivery error
/// enums, and HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `parley_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A durable-store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Store errors ---
            AppError::Store(StoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Store(StoreError::Backend(msg)) => {
                tracing::error!(error = %msg, "Store error");
                internal()
            }

            // --- Presence-and-delivery errors ---
            AppError::Auth(err) => (StatusCode::UNAUTHORIZED, err.code(), err.to_string()),
            AppError::Route(err) => match err {
                RouteError::Persistence(inner) => {
                    tracing::error!(error = %inner, "Failed to persist routed event");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        err.code(),
                        "The event could not be stored".to_string(),
                    )
                }
                RouteError::UnknownRecipient(_) | RouteError::CallNotFound(_) => {
                    (StatusCode::NOT_FOUND, err.code(), err.to_string())
                }
                RouteError::NotCallParticipant => {
                    (StatusCode::FORBIDDEN, err.code(), err.to_string())
                }
                RouteError::CallAlreadyEnded(_) => {
                    (StatusCode::CONFLICT, err.code(), err.to_string())
                }
                RouteError::InvalidPayload(_) => {
                    (StatusCode::BAD_REQUEST, err.code(), err.to_string())
                }
            },
            AppError::Receipt(err) => match err {
                ReceiptError::SpoofedReceipt => (StatusCode::FORBIDDEN, err.code(), err.to_string()),
                ReceiptError::ReceiptPersistFailed(inner) => {
                    tracing::error!(error = %inner, "Failed to persist read receipt");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        err.code(),
                        "Read state could not be updated".to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
