//! pharmacy-api server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), layers
//! environment overrides on top, opens the SQLite store and serves the JSON
//! API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use pharmacy_api::{AppState, ServerConfig, metrics::Metrics};
use pharmacy_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Pharmacy registry API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut server_cfg =
    ServerConfig::load(&cli.config).context("failed to load configuration")?;
  server_cfg.data_dir = expand_tilde(&server_cfg.data_dir);

  std::fs::create_dir_all(&server_cfg.data_dir).with_context(|| {
    format!("failed to create data directory {:?}", server_cfg.data_dir)
  })?;

  let db_path = server_cfg.database_path();
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open store at {db_path:?}"))?;
  tracing::info!(path = %db_path.display(), "store opened");

  let state = AppState {
    store:   Arc::new(store),
    metrics: Arc::new(Metrics::new().context("failed to register metrics")?),
    config:  Arc::new(server_cfg.clone()),
  };

  let app = pharmacy_api::router(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
