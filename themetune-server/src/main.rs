use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use themetune_config::{
    ConfigLoad, ConfigLoader, TomlSettingsFile, custom_path_override,
};
use themetune_core::{
    MappingStore, ThemeAcquisition, acquisition::RemoteThemeSource,
};
use themetune_server::{AppState, create_api_router, infra::catalog::FsSeriesCatalog};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "themetune-server")]
#[command(about = "Finds, downloads and serves TV series theme songs")]
struct Cli {
    /// Path to a themetune.toml configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Run one download pass right after startup
    #[arg(long, default_value_t = false)]
    download_on_start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.env_file {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().map_err(|err| {
        let context = match err.path() {
            Some(path) => format!("failed to load configuration from {}", path.display()),
            None => "failed to load configuration".to_string(),
        };
        anyhow::Error::new(err).context(context)
    })?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(message = %warning.message, hint = %hint, "configuration warning"),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    config
        .ensure_directories()
        .context("failed to prepare data directories")?;

    let settings_file = TomlSettingsFile::new(&config.themes.settings_path);
    let store = Arc::new(
        MappingStore::open(Arc::new(settings_file)).with_context(|| {
            format!(
                "failed to load theme song settings from {}",
                config.themes.settings_path.display()
            )
        })?,
    );
    store
        .apply_custom_path_override(custom_path_override().as_deref())
        .context("failed to persist custom theme song path override")?;

    let catalog = Arc::new(FsSeriesCatalog::new(config.library.roots.clone()));
    info!(roots = ?catalog.roots(), "library roots configured");

    let source = RemoteThemeSource::new(
        &config.themes.remote_base_url,
        config.themes.request_timeout,
    )
    .context("failed to build theme song source")?;
    let acquisition = Arc::new(ThemeAcquisition::new_with_concurrency(
        catalog.clone(),
        store.clone(),
        Arc::new(source),
        config.themes.max_concurrent_downloads,
    ));

    let state = AppState::new(store, catalog, acquisition);
    if cli.download_on_start {
        state.downloads.try_start();
    }

    let router = create_api_router(state);
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting themetune server on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("themetune server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
