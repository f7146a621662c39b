//! `shiptrackd` — the shipment tracking server binary.
//!
//! Usage:
//!   shiptrackd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/shiptrack/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod auth;
mod config;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use shiptrack_core::{Authenticator, Module};
use shiptrack_sql::{SQLStore, SqliteStore};
use shipments::effects::{EffectRunner, LogMailer, LogUnlocker};
use shipments::service::ShipmentService;
use shipments::ShipmentsModule;

use auth::TokenAuthenticator;
use config::ServerConfig;

/// Shipment tracking server.
#[derive(Parser, Debug)]
#[command(name = "shiptrackd", about = "Shipment tracking server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the config file).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    server_config.verify()?;

    let listen = cli.listen.unwrap_or_else(|| server_config.listen.clone());

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = shiptrack_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen,
        ..Default::default()
    };

    let sql: Arc<dyn SQLStore> = Arc::new(
        SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    // Post-commit effect worker. Mail and device unlock are log-only
    // until real collaborators are configured.
    let effects = EffectRunner::threaded(Arc::new(LogMailer), Arc::new(LogUnlocker))?;

    let service = ShipmentService::new(
        Arc::clone(&sql),
        effects,
        server_config.notify.admin_emails.clone(),
    )
    .map_err(|e| anyhow::anyhow!("failed to initialize shipment service: {}", e))?;

    let authenticator: Arc<dyn Authenticator> =
        Arc::new(TokenAuthenticator::new(server_config.auth.admin_token.clone()));

    let module = ShipmentsModule::new(service, authenticator);
    info!("Shipments module initialized");

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(module.routes());

    info!("Listening on {}", core_config.listen);
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
