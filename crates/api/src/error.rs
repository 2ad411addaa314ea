use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ghostline_core::error::CoreError;
use ghostline_db::StoreError;
use serde_json::json;

use crate::auth::device::DeviceAuthError;
use crate::auth::session::SessionError;
use crate::trust::TrustError;
use crate::ws::ticket::TicketError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the per-component error enums and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses of
/// the form `{"error": <message>, "code": <CODE>}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `ghostline_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage backend error.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    DeviceAuth(#[from] DeviceAuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Store(err) => classify_store_error(err),
            AppError::DeviceAuth(err) => classify_device_error(err),
            AppError::Session(err) => classify_session_error(err),
            AppError::Trust(err) => classify_trust_error(err),
            AppError::Ticket(err) => classify_ticket_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Log the detail, hand the client a sanitized message.
fn internal(detail: &dyn std::fmt::Display) -> ErrorParts {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn unauthorized(err: &dyn std::fmt::Display) -> ErrorParts {
    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string())
}

fn validation(err: &dyn std::fmt::Display) -> ErrorParts {
    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
}

fn classify_core_error(core: &CoreError) -> ErrorParts {
    match core {
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
    }
}

fn classify_store_error(err: &StoreError) -> ErrorParts {
    match err {
        StoreError::Database(db) => classify_sqlx_error(db),
        StoreError::Conflict(msg) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value: {msg}"),
        ),
        StoreError::Corrupt(_) => internal(err),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            internal(db_err)
        }
        other => internal(other),
    }
}

fn classify_device_error(err: &DeviceAuthError) -> ErrorParts {
    use DeviceAuthError as E;
    match err {
        E::Malformed(_) | E::MissingVerifier | E::MalformedVerifier | E::MalformedProof => {
            validation(err)
        }
        E::StaleTimestamp | E::InvalidNonce | E::VerifierMismatch | E::InvalidProof => {
            unauthorized(err)
        }
        E::UsernameExhausted => internal(err),
        E::Store(store) => classify_store_error(store),
        E::Session(session) => classify_session_error(session),
    }
}

fn classify_session_error(err: &SessionError) -> ErrorParts {
    match err {
        SessionError::InvalidToken => unauthorized(err),
        SessionError::Signing(_) => internal(err),
        SessionError::Store(store) => classify_store_error(store),
    }
}

fn classify_trust_error(err: &TrustError) -> ErrorParts {
    use TrustError as E;
    match err {
        E::Malformed(_) => validation(err),
        E::CodeNotFound | E::CardNotFound | E::RequestNotFound => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        E::CodeNotActive | E::OwnCard | E::CardNotActive | E::AlreadyResolved => {
            (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
        }
        E::NotRecipient => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
        E::Store(store) => classify_store_error(store),
    }
}

fn classify_ticket_error(err: &TicketError) -> ErrorParts {
    use TicketError as E;
    match err {
        E::PeerRequired | E::SelfPeer | E::MissingTicket => validation(err),
        E::InvalidTicket | E::BadTicket => unauthorized(err),
        E::NotTrusted => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
        E::Trust(trust) => classify_trust_error(trust),
    }
}
