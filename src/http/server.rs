//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the resource handlers
//! - Wire up the security pipeline in its fixed order
//! - Serve static assets ahead of the pipeline
//! - Bind server to listener and shut down gracefully
//!
//! # Layer order
//! ```text
//! request id → trace → metrics → cors → context/nonce
//!   → security headers → [dev log] → deadline → panic guard → rate limit
//!   → body ingestion → pollution defense → resource routes / 404
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::error::{not_found, panic_response};
use crate::http::handlers::{create_document, list_documents, AppState};
use crate::http::timeout::{enforce_deadline, Deadline};
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};
use crate::security::{
    cors::create_cors_layer,
    csp::ContentSecurityPolicy,
    headers::{apply_security_headers, SecurityHeaders},
    limits::{ingest_body, BodyStage},
    nonce::{attach_context, ContextStage},
    pollution::{defend_pollution, PollutionStage},
    rate_limit::{self, rate_limit, FixedWindowLimiter, RateLimitStage},
};
use crate::store::DocumentStore;

/// HTTP server for the resource API.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<FixedWindowLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and store.
    pub fn new(config: GatewayConfig, store: Arc<dyn DocumentStore>) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
        let state = AppState::new(store, config.resources.names.iter().cloned());
        let router = Self::build_router(&config, state, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the full application: static assets first, then the pipeline.
    fn build_router(config: &GatewayConfig, state: AppState, limiter: Arc<FixedWindowLimiter>) -> Router {
        let pipeline = Self::build_pipeline(config, state, limiter);

        if !config.static_files.enabled {
            return pipeline;
        }

        let assets = ServeDir::new(&config.static_files.dir)
            .call_fallback_on_method_not_allowed(true)
            .fallback(pipeline);
        Router::new().fallback_service(assets)
    }

    fn build_pipeline(config: &GatewayConfig, state: AppState, limiter: Arc<FixedWindowLimiter>) -> Router {
        let api_prefix = config.server.api_prefix.clone();
        let resource_path = format!("{}/{{resource}}", config.resources.base_path);
        let resources = get(list_documents).post(create_document).fallback(not_found);

        let mut router = Router::new()
            .route(&resource_path, resources.clone())
            .route(&format!("{resource_path}/"), resources)
            .fallback(not_found)
            .with_state(state)
            .layer(from_fn_with_state(
                PollutionStage::new(api_prefix.clone(), config.pollution.whitelist.iter().cloned()),
                defend_pollution,
            ))
            .layer(from_fn_with_state(
                BodyStage {
                    max_bytes: config.body.max_bytes,
                    api_prefix: api_prefix.clone(),
                },
                ingest_body,
            ));

        if config.rate_limit.enabled {
            router = router.layer(from_fn_with_state(
                RateLimitStage {
                    limiter,
                    api_prefix,
                    message: config.rate_limit.message.clone(),
                    trust_forwarded_for: config.rate_limit.trust_forwarded_for,
                },
                rate_limit,
            ));
        }

        router = router
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(from_fn_with_state(
                Deadline(Duration::from_secs(config.server.request_timeout_secs)),
                enforce_deadline,
            ));

        if config.server.mode.is_development() {
            router = router.layer(from_fn(logging::log_request));
        }

        let headers = SecurityHeaders::new(
            ContentSecurityPolicy::from_config(&config.csp),
            config.csp.nonce_scripts,
        );

        router
            .layer(from_fn_with_state(headers, apply_security_headers))
            .layer(from_fn_with_state(
                ContextStage {
                    trust_forwarded_for: config.rate_limit.trust_forwarded_for,
                },
                attach_context,
            ))
            .layer(create_cors_layer(&config.cors))
            .layer(from_fn(metrics::track_request))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled application, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = ?self.config.server.mode,
            "HTTP server starting"
        );

        if self.config.rate_limit.enabled {
            let limiter = self.limiter.clone();
            let interval = Duration::from_secs(self.config.rate_limit.cleanup_interval_secs);
            let mut stop = shutdown.subscribe();
            tokio::spawn(async move {
                tokio::select! {
                    _ = rate_limit::cleanup_task(limiter, interval) => {}
                    _ = stop.recv() => tracing::debug!("Rate limit cleanup stopped"),
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
