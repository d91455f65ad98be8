//! shrink server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use shrink_core::config::AppConfig;
use shrink_metadata::ShortUrlRepo;
use shrink_server::{AppState, create_router, spawn_sweep_task};
use shrink_signer::{CapabilitySigner, ServerSecret};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix for configuration environment variables.
const ENV_PREFIX: &str = "SHRINK_";

/// shrink - anonymous file uploads and URL shortening
#[derive(Parser, Debug)]
#[command(name = "shrinkd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SHRINK_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from the optional file, overridden by `SHRINK_` env vars.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    // SHRINK_CONFIG only carries the path.
    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with(ENV_PREFIX) && key != "SHRINK_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: shrinkd --config /path/to/config.toml\n  \
             2. Environment variables: SHRINK_SECRET__TYPE=env \
             SHRINK_SECRET__VAR=SHRINK_SERVER_SECRET shrinkd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set SHRINK_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("invalid configuration:\n  {}", errors.join("\n  ")))?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("shrink v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    let secret = ServerSecret::from_config(&config.secret).context("failed to load server secret")?;
    let signer = CapabilitySigner::new(secret).context("failed to initialize capability signer")?;

    let storage = shrink_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    let metadata = shrink_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata health check failed")?;
    let short_urls = metadata
        .count_short_urls()
        .await
        .context("failed to count short URLs")?;
    tracing::info!(short_urls, "Metadata store initialized");

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    let state = AppState::new(config, storage, metadata.clone(), signer);
    if state.notifier.is_enabled() {
        tracing::info!(
            targets = state.config.webhooks.urls.len(),
            "Webhook notifications enabled"
        );
    }
    let _sweep_handle = spawn_sweep_task(state.clone());

    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    metadata.close().await;
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
