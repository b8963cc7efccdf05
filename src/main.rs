//! Sorcery Catalog - REST API for a jujutsu sorcery catalog
//!
//! The service:
//! - Stores characters, clans, techniques and domain expansions in memory or SQLite
//! - Keeps the references between them consistent on every write
//! - Rate limits clients with a fixed window per address
//! - Answers repeated POST bodies with the first response instead of re-running them

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http;
use crate::infrastructure::state::AppState;

/// How often expired rate-limit windows and idempotency entries are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sorcery_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sorcery Catalog");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Storage: {:?}", config.storage.backend);
    tracing::info!("  Sentinel clan: {}", config.sentinel_clan);
    tracing::info!(
        "  Rate limit: {} requests per {}s",
        config.rate_limit.limit,
        config.rate_limit.window.as_secs()
    );

    // Initialize application state
    let port = config.server_port;
    let state = Arc::new(AppState::new(config).await?);
    tracing::info!("Application state initialized");

    // Sweep worker (drops expired rate-limit counters and idempotency entries)
    let sweep_worker = {
        let state = state.clone();
        tokio::spawn(async move {
            tracing::info!("Starting sweep worker");
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let counters = state.rate_limiter.prune().await;
                let entries = state.idempotency.prune().await;
                if counters > 0 || entries > 0 {
                    tracing::debug!(counters, entries, "Swept expired pipeline state");
                }
            }
        })
    };

    // Build the router
    let app = http::build_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Peer addresses feed the rate limiter when no X-Forwarded-For is sent
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping workers...");
            sweep_worker.abort();
            tracing::info!("Workers stopped");
        }
    }

    Ok(())
}
