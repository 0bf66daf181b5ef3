//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use resource_gateway::config::GatewayConfig;
use resource_gateway::query::StructuredQuery;
use resource_gateway::store::{DocumentStore, MemoryStore, StoreError};
use resource_gateway::HttpServer;

pub const TOURS: [(&str, u64, &str, f64); 4] = [
    ("The Forest Hiker", 397, "easy", 4.7),
    ("The Sea Explorer", 497, "medium", 4.8),
    ("The Snow Adventurer", 997, "difficult", 4.5),
    ("The City Wanderer", 1197, "easy", 4.6),
];

/// Defaults with static serving off, so every path reaches the pipeline.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.static_files.enabled = false;
    config
}

pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_collections(["tours", "users", "reviews"]));
    for (name, price, difficulty, rating) in TOURS {
        store
            .create(
                "tours",
                json!({
                    "name": name,
                    "price": price,
                    "difficulty": difficulty,
                    "ratingsAverage": rating,
                }),
            )
            .await
            .unwrap();
    }
    store
}

pub async fn app(config: GatewayConfig) -> Router {
    HttpServer::new(config, seeded_store().await).router()
}

pub fn app_with_store(config: GatewayConfig, store: Arc<dyn DocumentStore>) -> Router {
    HttpServer::new(config, store).router()
}

/// Build a request as if it arrived from `peer`.
pub fn request_from(peer: [u8; 4], method: Method, uri: &str, body: Body) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    req
}

pub fn get(uri: &str) -> Request<Body> {
    request_from([192, 0, 2, 1], Method::GET, uri, Body::empty())
}

pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Store whose backend always fails with an internal-looking message.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find(&self, _: &str, _: &StructuredQuery) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Backend("connection refused by 10.0.0.5:27017".into()))
    }

    async fn create(&self, _: &str, _: Value) -> Result<Value, StoreError> {
        Err(StoreError::Backend("connection refused by 10.0.0.5:27017".into()))
    }
}

/// Store that panics, standing in for a handler defect.
pub struct PanickingStore;

#[async_trait]
impl DocumentStore for PanickingStore {
    async fn find(&self, _: &str, _: &StructuredQuery) -> Result<Vec<Value>, StoreError> {
        panic!("index out of bounds in cursor 0x7f3a")
    }

    async fn create(&self, _: &str, _: Value) -> Result<Value, StoreError> {
        panic!("index out of bounds in cursor 0x7f3a")
    }
}

/// Store that answers only after `delay`.
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn find(&self, _: &str, _: &StructuredQuery) -> Result<Vec<Value>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn create(&self, _: &str, document: Value) -> Result<Value, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(document)
    }
}
