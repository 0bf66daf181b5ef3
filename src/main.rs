//! Resource API gateway.
//!
//! ```text
//!     Client Request
//!     ──▶ static assets ──hit──▶ file response
//!             │ miss
//!             ▼
//!     cors → context/nonce → security headers → rate limit
//!          → body ingestion → pollution defense → resource handlers ──▶ store
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use resource_gateway::config::{self, GatewayConfig, Mode};
use resource_gateway::lifecycle::{signals, Shutdown};
use resource_gateway::observability::{logging, metrics};
use resource_gateway::store::{DocumentStore, MemoryStore};
use resource_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "resource-gateway")]
#[command(about = "Resource API gateway with query translation and a security pipeline", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the run mode (development or production).
    #[arg(short, long)]
    mode: Option<Mode>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::loader::finalize(GatewayConfig::default())?,
    };
    if let Some(mode) = cli.mode {
        config.server.mode = mode;
    }

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("resource-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        mode = ?config.server.mode,
        resources = ?config.resources.names,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = MemoryStore::with_collections(config.resources.names.iter().cloned());
    if let Some(seed) = &config.store.seed_path {
        store.load_seed(Path::new(seed))?;
    }
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    HttpServer::new(config, store).run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
