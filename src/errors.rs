//! Unified error type for the booking engine.
//!
//! Every expected failure mode has its own variant with a machine-readable
//! kind, so callers (and the HTTP layer) can distinguish a malformed request
//! from a business rejection from a transient concurrency abort. Only
//! unexpected store failures map to `Database`/`Other` and are treated as
//! internal errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::availability::Shortfall;
use crate::booking::BookingStatus;
use crate::types::BookingId;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the booking engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request; no side effects
    #[error("{message}")]
    Validation { message: String },

    /// Business rejection: insufficient stock for one or more items
    #[error("insufficient availability for {} item(s)", shortfalls.len())]
    Capacity { shortfalls: Vec<Shortfall> },

    /// Transient concurrency abort; safe to retry
    #[error("concurrent booking conflict: {0}")]
    Conflict(String),

    /// Booking not found
    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    /// Illegal booking lifecycle transition
    #[error("illegal status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Internal error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Whether the operation may be retried as-is. Only concurrency aborts
    /// qualify; a capacity rejection will not change by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Machine-readable error kind, stable across messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "ValidationError",
            Error::Capacity { .. } => "CapacityError",
            Error::Conflict(_) => "ConflictError",
            Error::BookingNotFound(_) => "NotFoundError",
            Error::InvalidTransition { .. } => "InvalidTransitionError",
            Error::Database(_) | Error::Other(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Capacity { .. } => StatusCode::CONFLICT,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::BookingNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Database(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Serialization failures and deadlocks from Postgres are concurrency aborts,
/// not store faults: surface them as retryable conflicts.
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") => {
                    return Error::Conflict(db_err.message().to_string());
                }
                _ => {}
            }
        }
        Error::Database(e)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Full detail in the logs, level by severity
        match &self {
            Error::Database(_) | Error::Other(_) => {
                tracing::error!("Internal engine error: {:#}", self);
            }
            Error::Conflict(_) => {
                tracing::warn!("Concurrency conflict surfaced to caller: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        let mut error_body = json!({
            "kind": self.kind(),
            "message": match &self {
                // Never leak internal detail to the caller
                Error::Database(_) | Error::Other(_) => "internal error".to_string(),
                other => other.to_string(),
            },
        });
        if let Error::Capacity { shortfalls } = &self {
            error_body["shortfalls"] = json!(shortfalls);
        }

        let body = json!({ "ok": false, "error": error_body });
        (status, axum::Json(body)).into_response()
    }
}
