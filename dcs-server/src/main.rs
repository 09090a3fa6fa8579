//! dcs-server - Data Conservancy deposit service
//!
//! Serves the JSON API for projects, collections, depositors and data item
//! deposits, and runs the archive worker that moves deposits into the
//! archive store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dcs_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use dcs_common::db::{init_database, set_setting};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dcs_server::services::{accounts, deposit};
use dcs_server::services::archive::{ArchiveWorker, FsArchiveStore};
use dcs_server::AppState;

/// Command-line arguments for dcs-server
#[derive(Parser, Debug)]
#[command(name = "dcs-server")]
#[command(about = "Data Conservancy deposit service")]
#[command(version)]
struct Args {
    /// Root folder holding the database, staging area and archive
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file (defaults to the standard search path)
    #[arg(short, long, env = "DCS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration file
    #[arg(short, long, env = "DCS_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TomlConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_or_default(),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "dcs-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Step 1: Resolve and initialize the root folder
    let root_folder = RootFolderResolver::new("dcs-server")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    // Step 2: Open or create the database
    let db_path = initializer.database_path();
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    // The settings table mirrors the effective startup configuration
    set_setting(
        &pool,
        "session_lifetime_hours",
        &config.session_lifetime_hours.to_string(),
    )
    .await?;
    set_setting(
        &pool,
        "archive_poll_interval_ms",
        &config.archive.poll_interval_ms.to_string(),
    )
    .await?;
    set_setting(
        &pool,
        "archive_batch_size",
        &config.archive.batch_size.to_string(),
    )
    .await?;

    // Step 3: Make sure an administrator can log in
    if let Some(admin) = accounts::ensure_bootstrap_admin(&pool, &config.bootstrap_admin)
        .await
        .context("Failed to create bootstrap administrator")?
    {
        info!("Bootstrap administrator: {}", admin.email);
    }

    // Step 4: Archive store and background worker
    let store = Arc::new(FsArchiveStore::new(initializer.archive_dir()));
    let cancel = CancellationToken::new();
    let worker = ArchiveWorker::new(
        pool.clone(),
        store.clone(),
        dcs_common::time::millis_to_duration(config.archive.poll_interval_ms),
        config.archive.batch_size,
    )
    .spawn(cancel.clone());

    // Step 5: HTTP server
    let state = AppState::new(
        pool.clone(),
        store,
        initializer.staging_dir(),
        chrono::Duration::hours(config.session_lifetime_hours),
    )
    .with_body_limit(
        deposit::configured_body_limit(&pool)
            .await
            .context("Failed to read deposit size limit")?,
    );
    let app = dcs_server::build_router(state);

    let bind = args.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Err(e) = worker.await {
        tracing::error!("Archive worker task failed: {}", e);
    }
    pool.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
