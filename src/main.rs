//! Gravatar Gateway - account to avatar redirect service
//!
//! Standalone server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gravatar_gateway::api::create_router;
use gravatar_gateway::lookup::SqlAccountStore;
use gravatar_gateway::{spawn_reclaim_task, AppState, Config};

#[derive(Parser, Debug)]
#[command(name = "gravatar_gateway", version, about = "Account avatar redirect service")]
struct Args {
    /// Config file location
    #[arg(long, default_value = "gravatar.config.json", env = "GRAVATAR_CONFIG")]
    config: PathBuf,

    /// Listen address, overrides `listen_addr` from the config file
    #[arg(long, env = "GRAVATAR_LISTEN")]
    listen: Option<String>,
}

/// Main entry point for the Gravatar Gateway server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from the config file
/// 3. Create the lookup store and check connectivity
/// 4. Start background cache reclaim task
/// 5. Create Axum router
/// 6. Start HTTP server on configured address
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gravatar_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    info!(
        "Config loaded: {} (cache_life={:?}, cache_interval={:?})",
        args.config.display(),
        config.cache_life,
        config.cache_interval
    );

    let store = SqlAccountStore::connect_lazy(&config).context("configuring database pool")?;
    if let Err(e) = store.ping().await {
        // Not fatal: requests surface the failure as 500 until the db is back.
        error!("Database ping error: {}", e);
    }

    let listen_addr = config.listen_addr.clone();
    let state = AppState::standalone(config, Arc::new(store));

    let reclaim_handle = spawn_reclaim_task(
        state.cache.clone(),
        state.config.cache_life,
        state.config.cache_interval,
        state.log.clone(),
    );
    info!("Background reclaim task started");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr.as_str())
        .await
        .with_context(|| format!("binding {}", listen_addr))?;
    info!("Listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(reclaim_handle))
        .await
        .context("serving http")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the reclaim task and allows graceful shutdown.
async fn shutdown_signal(reclaim_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    reclaim_handle.abort();
    warn!("Reclaim task aborted");
}
