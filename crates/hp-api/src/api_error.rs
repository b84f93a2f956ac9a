//! HTTP API error types.
//!
//! Provides a unified `ApiError` enum for consistent error responses across
//! the HTTP API layer. Implements Axum's `IntoResponse` trait to automatically
//! convert errors into appropriate HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur in the HTTP API layer.
///
/// Maps onto the exit-code convention for the HTTP surface: 400 for semantic
/// validation, 401 for missing/invalid credentials, 403 for authorization,
/// 404 for unknown ids, 409 for a state conflict, 422 for schema validation,
/// 503 when the daemon cannot currently accept the request, 500 for
/// everything else.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed or invalid (semantic validation failure,
    /// e.g. a ticket tracking requirement was not met).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid `X-Agent-ID` / API key.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is not authorized to perform this action (e.g. a
    /// non-validator agent submitting a validation review).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The action is blocked by an open ticket. Not a failure: the caller
    /// asked to do something that is legitimately on hold, so this renders
    /// as a normal 200 response with `blocked: true` rather than an error
    /// status.
    #[error("blocked: {0}")]
    Blocked(String),

    /// The request conflicts with the current state of the target entity
    /// (e.g. submitting a result for a task that is already done).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A required field was missing or failed schema validation.
    #[error("unprocessable: {0}")]
    UnprocessableEntity(String),

    /// The daemon cannot currently service the request (e.g. shutting down).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal server error occurred.
    #[error("internal error: {0}")]
    InternalError(String),
}

// ---------------------------------------------------------------------------
// IntoResponse implementation
// ---------------------------------------------------------------------------

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Blocked(reason) = &self {
            let body = Json(json!({
                "blocked": true,
                "reason": reason,
            }));
            return (StatusCode::OK, body).into_response();
        }

        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Blocked(_) => unreachable!("handled above"),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_found_response() {
        let error = ApiError::NotFound("task not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        assert!(body_str.contains("\"error\""));
        assert!(body_str.contains("task not found"));
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let error = ApiError::BadRequest("invalid input".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        assert!(body_str.contains("\"error\""));
        assert!(body_str.contains("invalid input"));
    }

    #[tokio::test]
    async fn test_blocked_response_is_200_with_flag() {
        let error = ApiError::Blocked("ticket TICK-1 is open".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        assert!(body_str.contains("\"blocked\":true"));
    }

    #[tokio::test]
    async fn test_conflict_response() {
        let error = ApiError::Conflict("task already completed".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_error_response() {
        let error = ApiError::InternalError("database connection failed".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        assert!(body_str.contains("\"error\""));
        assert!(body_str.contains("database connection failed"));
    }
}
