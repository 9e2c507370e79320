//! wba-analyzer - Emotion-Wellbeing Analysis Service
//!
//! Accepts text, audio and facial-image signals, fuses the per-modality
//! emotion distributions into one wellbeing score and recommendation, and
//! keeps a per-user session history.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wba_analyzer::classifiers::ClassifierSet;
use wba_analyzer::db::SqliteSessionStore;
use wba_analyzer::fusion::SynonymTable;
use wba_analyzer::{build_router, AppState, SessionOrchestrator};
use wba_common::config::{
    resolve_config_path, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use wba_common::Modality;

/// Command-line arguments for wba-analyzer
#[derive(Parser, Debug)]
#[command(name = "wba-analyzer")]
#[command(about = "Multi-modal emotion fusion and wellbeing scoring service")]
#[command(version)]
struct Args {
    /// Configuration file (overrides WBA_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder holding the session database (overrides WBA_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "WBA_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "WBA_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the default log level
    let config_path = resolve_config_path(args.config.as_deref());
    let (config, config_source) = TomlConfig::load_with_source(config_path.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting wba-analyzer v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    // Loading ran before the subscriber existed; report its outcome now
    config_source.log();

    // Root folder: CLI > env > TOML > platform default
    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = wba_analyzer::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let classifiers = ClassifierSet::from_config(&config.classifiers)
        .context("Failed to build classifier clients")?;
    for modality in Modality::ALL {
        match classifiers.get(modality) {
            Some(classifier) => info!("{} classifier: {}", modality, classifier.name()),
            None => warn!("{} classifier not configured; {} input will be absent", modality, modality),
        }
    }

    let mut synonyms = SynonymTable::default();
    synonyms.extend(config.fusion.synonyms.clone());

    let orchestrator = SessionOrchestrator::new(
        classifiers,
        Arc::new(SqliteSessionStore::new(db_pool.clone())),
    )
    .with_synonyms(synonyms)
    .with_default_weights(config.fusion.weights);

    let state = AppState::new(db_pool, orchestrator)
        .with_allowed_origins(config.server.allowed_origins.clone());
    let app = build_router(state);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
