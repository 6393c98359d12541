//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Keeps error bodies uniform across endpoints and translates authorization
//! failures into HTTP responses.
//!
//! # Key invariants and assumptions
//! - Every error body carries a stable `code` and a human-readable `message`.
//! - A failed permission check is indeterminate and maps to 500, never to a
//!   deny.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use backstage_authz::AuthzError;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use backstage_api::api::error::api_not_found;
///
/// let err = api_not_found("role not found");
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Translate a library error, logging the details.
///
/// A malformed menu definition is the caller's fault; everything else is
/// reported as an internal failure with a generic `message`.
pub fn api_authz(message: &str, err: &AuthzError) -> ApiError {
    let kind = if err.is_engine_failure() { "engine" } else { "request" };
    metrics::counter!("backstage_api_errors_total", "kind" => kind).increment(1);
    match err {
        AuthzError::MenuFormat(source) => {
            tracing::warn!(error = %source, "rejected menu definition");
            api_validation_error(&format!("{message}: {source}"))
        }
        AuthzError::PartialReconciliation {
            user,
            added,
            removed,
            failed_role,
            ..
        } => {
            tracing::error!(error = ?err, "role reconciliation incomplete");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_reconciliation",
                &format!(
                    "{message}: roles for {user} partially updated \
                     (added {added:?}, removed {removed:?}, failed on {failed_role})"
                ),
            )
        }
        _ => {
            tracing::error!(error = ?err, "authorization backend error");
            api_internal_message(message)
        }
    }
}
