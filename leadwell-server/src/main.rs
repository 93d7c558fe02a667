//! leadwell-server - construction lead-management service
//!
//! Serves the JSON REST API over the selected storage backend and wires the
//! language-model client into scoring, form intake, insights and call
//! summaries.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use leadwell_common::config::{
    default_config_path, ensure_root_folder, load_toml_config, ConfigOverrides, ServiceConfig,
    StorageBackend, TomlConfig,
};
use tokio::signal;
use tracing::{error, info, warn};

use leadwell_server::services::OpenAiClient;
use leadwell_server::storage::{MemoryStorage, SharedStorage, SqliteStorage};
use leadwell_server::{build_router, db, seed, AppState};

/// Command-line arguments for leadwell-server
#[derive(Parser, Debug)]
#[command(name = "leadwell-server")]
#[command(about = "Lead management service for construction firms")]
#[command(version)]
struct Args {
    /// TOML bootstrap file
    #[arg(short, long, env = "LEADWELL_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "LEADWELL_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Storage backend (sqlite or memory)
    #[arg(long)]
    storage: Option<StorageBackend>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            root_folder: self.root_folder.clone(),
            bind_address: self.bind.clone(),
            port: self.port,
            storage: self.storage,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let overrides = args.overrides();

    // The TOML file decides the log level, so it is read before tracing exists
    let config_path = overrides.config_path.clone().or_else(default_config_path);
    let toml_result = match &config_path {
        Some(path) => load_toml_config(path),
        None => Ok(TomlConfig::default()),
    };
    let level = overrides.log_level.clone().unwrap_or_else(|| {
        toml_result
            .as_ref()
            .map(|t| t.logging.level.clone())
            .unwrap_or_else(|_| leadwell_common::config::DEFAULT_LOG_LEVEL.to_string())
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    info!(
        "Starting LeadWell server (leadwell-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_config = toml_result.context("Failed to load configuration file")?;
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file not found: {} (using defaults)", path.display()),
        None => warn!("No config directory on this platform (using defaults)"),
    }

    let config = match ServiceConfig::resolve(&overrides, &toml_config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    ensure_root_folder(&config.root_folder).context("Failed to initialize root folder")?;
    info!("Root folder: {}", config.root_folder.display());

    let storage: SharedStorage = match config.storage {
        StorageBackend::Sqlite => {
            info!("Database: {}", config.database_path.display());
            let pool = db::init_database_pool(&config.database_path)
                .await
                .context("Failed to open database")?;
            Arc::new(SqliteStorage::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on exit");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.seed_reference_data {
        let report = seed::seed_reference_data(storage.as_ref())
            .await
            .context("Failed to seed reference data")?;
        if report.project_types + report.marketing_channels > 0 {
            info!(
                project_types = report.project_types,
                marketing_channels = report.marketing_channels,
                "Seeded reference data"
            );
        }
    }

    let reasoning = OpenAiClient::new(&config.reasoning).context("Failed to build model client")?;
    info!(model = reasoning.model(), "Model client ready");

    let state = AppState::new(storage, Arc::new(reasoning));
    let app = build_router(state);

    let listen_address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .with_context(|| format!("Failed to bind to {}", listen_address))?;
    info!("Listening on http://{}", listen_address);
    info!("Health check: http://{}/health", listen_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install terminate handler: {}", e);
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
