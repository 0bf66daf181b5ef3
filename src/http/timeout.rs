//! Request deadline.
//!
//! Runs inside the security headers stage so a timed-out request is answered
//! by the error responder and still carries the policy headers.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::{AppError, OperationalError};

pub const TIMEOUT_MESSAGE: &str = "Request took too long to complete";

/// State for the deadline stage.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(pub Duration);

pub async fn enforce_deadline(
    State(Deadline(limit)): State<Deadline>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, timeout_ms = limit.as_millis() as u64, "Request timed out");
            AppError::from(OperationalError::new(TIMEOUT_MESSAGE, StatusCode::REQUEST_TIMEOUT))
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/fast", get(|| async { "ok" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(from_fn_with_state(Deadline(Duration::from_millis(50)), enforce_deadline))
    }

    fn get_req(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_slow_handler_gets_json_408() {
        let response = app().oneshot(get_req("/slow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], TIMEOUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_fast_handler_untouched() {
        let response = app().oneshot(get_req("/fast")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
