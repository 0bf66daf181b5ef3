//! Body ingestion stage.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Parse JSON bodies into the request context
//! - Parse cookies into the request context
//!
//! # Design Decisions
//! - A declared `Content-Length` over the cap is rejected before reading
//! - Chunked bodies are read incrementally and rejected once they cross the cap
//! - Non-JSON bodies are passed through untouched

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use futures_util::StreamExt;

use crate::http::context::{parse_cookies, RequestContext};
use crate::http::error::{AppError, OperationalError};
use crate::security::is_api_path;

/// State for the body ingestion stage.
#[derive(Debug, Clone)]
pub struct BodyStage {
    pub max_bytes: usize,
    pub api_prefix: String,
}

pub async fn ingest_body(
    State(stage): State<BodyStage>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_api_path(request.uri().path(), &stage.api_prefix) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > stage.max_bytes as u64) {
        tracing::warn!(path = %parts.uri.path(), limit = stage.max_bytes, "Declared body too large");
        return Err(OperationalError::payload_too_large(stage.max_bytes).into());
    }

    let bytes = read_limited(body, stage.max_bytes).await.inspect_err(|_| {
        tracing::warn!(path = %parts.uri.path(), limit = stage.max_bytes, "Body rejected while reading");
    })?;

    let parsed = if is_json(&parts.headers) && !bytes.is_empty() {
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| OperationalError::bad_request(format!("Invalid JSON body: {e}")))?;
        Some(value)
    } else {
        None
    };

    let cookies = parse_cookies(&parts.headers);
    if let Some(ctx) = parts.extensions.get_mut::<RequestContext>() {
        ctx.cookies = cookies;
        ctx.body = parsed;
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Buffer the body, failing as soon as it grows past `max_bytes`.
async fn read_limited(body: Body, max_bytes: usize) -> Result<Bytes, AppError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::debug!(error = %e, "Failed reading request body");
            OperationalError::bad_request("Failed to read request body")
        })?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(OperationalError::payload_too_large(max_bytes).into());
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware::from_fn_with_state, routing::post, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/api/v1/tours",
                post(|ctx: RequestContext| async move {
                    format!(
                        "{}|{}",
                        ctx.body.as_ref().map(|b| b.to_string()).unwrap_or_default(),
                        ctx.cookie("jwt").unwrap_or("-")
                    )
                }),
            )
            .route("/upload", post(|body: Bytes| async move { body.len().to_string() }))
            .layer(from_fn_with_state(
                BodyStage { max_bytes: 10 * 1024, api_prefix: "/api".into() },
                ingest_body,
            ))
            .layer(axum::middleware::from_fn(|mut req: Request, next: Next| async move {
                req.extensions_mut()
                    .insert(RequestContext::new([127, 0, 0, 1].into(), "n".into()));
                next.run(req).await
            }))
    }

    fn json_post(uri: &str, body: impl Into<Body>) -> Request {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("cookie", "jwt=token123")
            .body(body.into())
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_json_and_cookies_reach_context() {
        let response = app()
            .oneshot(json_post("/api/v1/tours", r#"{"name":"The Park Camper"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, r#"{"name":"The Park Camper"}|token123"#);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let big = format!(r#"{{"blob":"{}"}}"#, "x".repeat(11 * 1024));
        let response = app().oneshot(json_post("/api/v1/tours", big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_streamed_oversized_body_rejected() {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            (0..12).map(|_| Ok(Bytes::from(vec![b' '; 1024]))).collect();
        let body = Body::from_stream(futures_util::stream::iter(chunks));
        let response = app().oneshot(json_post("/api/v1/tours", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = app().oneshot(json_post("/api/v1/tours", "{nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_api_paths_bypass() {
        let big = "x".repeat(20 * 1024);
        let response = app().oneshot(json_post("/upload", big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, (20 * 1024).to_string());
    }
}
