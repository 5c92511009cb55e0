//! Keycloak Registration Service
//!
//! Entry point. Exposes user registration and login over HTTP and delegates
//! both to Keycloak.
//!
//! # Flow
//! 1. Load configuration
//! 2. Initialize logging
//! 3. Build the Keycloak clients
//! 4. Serve the HTTP API until Ctrl-C

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use keycloak_registration::config::{Config, LoggingConfig};
use keycloak_registration::{api, build_service};

/// Initializes the logging system.
///
/// Level comes from `RUST_LOG`, defaulting to `info`.
fn setup_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_writer(std::io::stdout);

    if config.json {
        builder.json().try_init()
    } else {
        builder.with_ansi(true).try_init()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::new().context("Failed to load configuration")?;

    setup_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!(
        keycloak = %config.keycloak.server_url,
        realm = %config.keycloak.realm,
        "Keycloak Registration Service starting up..."
    );

    let service = build_service(&config).context("Failed to create Keycloak clients")?;
    let app = api::router(Arc::new(service));

    let addr = format!("{}:{}", config.server.endpoint, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
