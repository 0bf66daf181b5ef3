//! Real-socket test: bind, serve, query with an HTTP client, shut down.

use std::time::Duration;

use tokio::net::TcpListener;

use resource_gateway::{HttpServer, Shutdown};

mod common;

#[tokio::test]
async fn test_serve_and_graceful_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = common::seeded_store().await;
    let server = HttpServer::new(common::test_config(), store);
    let shutdown = Shutdown::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(listener, &shutdown).await })
    };

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/v1/tours?limit=2&sort=price"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-ratelimit-limit"], "100");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["results"], 2);
    assert_eq!(body["data"]["data"][0]["name"], "The Forest Hiker");

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
