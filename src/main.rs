//! Storefront guard.
//!
//! Admission control and request logging in front of the storefront's
//! content API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ admission ─────────────▶ request log ─▶ handler
//!                                  │ rate limit  (429)       │ entry in    │ templates
//!                                  │ origin      (403)       │ exit out    │ admin
//!                                  │ size        (413)       │
//!                                  │ auth        (401)       │
//!                                  │ input       (400)       │
//!                                  ▼                         ▼
//!                            JSON rejection           memory + logs/requests.log
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_guard::config::{load_config, load_from_env};
use storefront_guard::lifecycle::{shutdown_signal, Shutdown};
use storefront_guard::observability::{logging, metrics};
use storefront_guard::HttpServer;

#[derive(Parser)]
#[command(name = "storefront-guard")]
#[command(about = "Admission control and request logging for the storefront API", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults plus environment
    /// overrides are used when omitted.
    #[arg(short, long, env = "GUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_tracing(&config.observability);
    tracing::info!("storefront-guard v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        window_ms = config.security.window_ms,
        max_requests = config.security.max_requests,
        max_request_size = config.security.max_request_size,
        allowed_origins = ?config.security.allowed_origins,
        require_auth = config.security.require_auth,
        validate_input = config.security.validate_input,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
