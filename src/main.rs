//! Redis KV Store - An HTTP key-value store over Redis hashes
//!
//! Serves CRUD operations on key-value pairs with optional expiry.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redis_kv_store::api::{create_router, AppState};
use redis_kv_store::config::{Config, SERVICE_DESCRIPTION, SERVICE_NAME};
use redis_kv_store::metrics::init_metrics;
use redis_kv_store::store::{HashStore, MemoryStore, RedisStore};
use redis_kv_store::tasks::spawn_sweeper;

/// Main entry point for the key-value server.
///
/// # Startup Sequence
/// 1. Load configuration from environment variables
/// 2. Initialize tracing subscriber for logging
/// 3. Connect to the backing store
/// 4. Install the Prometheus recorder
/// 5. Start the background expiry sweeper
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM, stop serving, then stop the sweeper
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config comes first: the profile picks the default log level
    let config = Config::from_env().context("Invalid configuration")?;

    // Defaults per profile, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.profile.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} ({})", SERVICE_NAME, SERVICE_DESCRIPTION);
    info!(
        "Configuration loaded: profile={}, port={}, sweep_interval={}ms",
        config.profile, config.server_port, config.sweep_interval_ms
    );

    let store: Arc<dyn HashStore> = if config.profile.uses_memory_store() {
        info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            RedisStore::connect(&config.redis_url)
                .await
                .with_context(|| format!("Failed to connect to {}", config.redis_url))?,
        )
    };

    init_metrics().context("Failed to install Prometheus recorder")?;

    let state = AppState::new(store);

    // Sweeper starts only once the store is reachable
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = spawn_sweeper(state.store(), config.sweep_interval(), shutdown_rx);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the sweeper and wait for any in-flight pass
    let _ = shutdown_tx.send(true);
    if let Err(err) = sweeper_handle.await {
        warn!("Expiry sweeper ended abnormally: {}", err);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
