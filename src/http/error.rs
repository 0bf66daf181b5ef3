//! Error taxonomy and the terminal error responder.
//!
//! # Design Decisions
//! - Operational errors carry a message that is safe to show to clients
//! - Anything else is logged in full and answered with a fixed generic 500
//! - Every stage returns `AppError` directly instead of continuing the chain

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::observability::metrics;
use crate::query::QueryError;
use crate::store::StoreError;

/// Message sent to clients for every unexpected failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

/// Expected, user-facing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationalError {
    message: String,
    status_code: StatusCode,
}

impl OperationalError {
    pub fn new(message: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(format!("Can't find {path} on this server!"), StatusCode::NOT_FOUND)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::TOO_MANY_REQUESTS)
    }

    pub fn payload_too_large(limit_bytes: usize) -> Self {
        Self::new(
            format!("Request body exceeds the {limit_bytes} byte limit"),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// `"fail"` for client errors, `"error"` for everything else.
    pub fn status_label(&self) -> &'static str {
        if self.status_code.is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    pub fn is_operational(&self) -> bool {
        true
    }
}

impl fmt::Display for OperationalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status_code)
    }
}

impl std::error::Error for OperationalError {}

/// Any failure that reaches the terminal responder.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Operational(#[from] OperationalError),

    #[error("unexpected error: {0}")]
    Unexpected(Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn unexpected(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AppError::Unexpected(error.into())
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, AppError::Operational(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Operational(e) => e.status_code(),
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::Operational(OperationalError::bad_request(e.to_string()))
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::unexpected(e)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Operational(e) => {
                metrics::record_error("operational");
                let body = ErrorBody {
                    status: e.status_label(),
                    message: e.message(),
                };
                (e.status_code(), Json(body)).into_response()
            }
            AppError::Unexpected(e) => {
                metrics::record_error("unexpected");
                tracing::error!(error = %e, detail = ?e, "Unexpected error");
                generic_error_response()
            }
        }
    }
}

/// Fixed 500 response that exposes nothing about the cause.
pub fn generic_error_response() -> Response {
    let body = ErrorBody {
        status: "error",
        message: GENERIC_ERROR_MESSAGE,
    };
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Panic handler for `CatchPanicLayer`; panics are programming defects.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    metrics::record_error("panic");
    tracing::error!(panic = %detail, "Handler panicked");
    generic_error_response()
}

/// Catch-all for unregistered paths.
pub async fn not_found(uri: axum::http::Uri) -> AppError {
    OperationalError::not_found(uri.path()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_label() {
        assert_eq!(OperationalError::not_found("/x").status_label(), "fail");
        assert_eq!(
            OperationalError::new("down", StatusCode::SERVICE_UNAVAILABLE).status_label(),
            "error"
        );
        assert!(OperationalError::not_found("/x").is_operational());
    }

    #[tokio::test]
    async fn test_operational_response() {
        let response = AppError::from(OperationalError::not_found("/api/v1/nope")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Can't find /api/v1/nope on this server!");
    }

    #[tokio::test]
    async fn test_unexpected_hides_detail() {
        let err = AppError::unexpected("connection string postgres://admin:hunter2@db");
        assert!(!err.is_operational());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_query_error_is_bad_request() {
        let err: AppError = QueryError::MixedProjection.into();
        assert!(err.is_operational());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_error_is_unexpected() {
        let err: AppError = StoreError::Backend("disk on fire".into()).into();
        assert!(!err.is_operational());
        let body = body_json(err.into_response()).await;
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_panic_response() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
    }
}
