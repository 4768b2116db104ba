//! carpark server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, registers the configured users, loads the initial dataset
//! if one is configured, and serves the JSON API over HTTP.
//!
//! # Token generation
//!
//! To mint a bearer token and the `token_hash` to put in config.toml:
//!
//! ```
//! cargo run -p carpark-server --bin server -- --generate-token
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use carpark_core::store::CarparkStore as _;
use carpark_server::{
  AppState, ServerConfig,
  token::{generate_token, hash_token},
};
use carpark_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Carpark API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a fresh bearer token and its hash, then exit.
  #[arg(long)]
  generate_token: bool,
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

  if cli.generate_token {
    let token = generate_token();
    println!("token:      {token}");
    println!("token_hash: {}", hash_token(&token));
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CARPARK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  for user in &server_cfg.users {
    store
      .upsert_user(&user.username, &user.token_hash)
      .await
      .with_context(|| format!("failed to register user {:?}", user.username))?;
  }
  tracing::info!(users = server_cfg.users.len(), "registered users");

  if let Some(dataset) = &server_cfg.initial_dataset {
    let dataset = expand_tilde(dataset);
    let report = store
      .ingest_path(&dataset)
      .await
      .with_context(|| format!("failed to load initial dataset {dataset:?}"))?;
    tracing::info!(
      path = %dataset.display(),
      records = report.records,
      "loaded initial dataset"
    );
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg),
  };
  let app = carpark_server::router(state);

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
