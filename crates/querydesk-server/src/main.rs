//! querydesk server binary.
//!
//! Reads `querydesk.toml` (or the path given with `--config`), opens the
//! SQLite query store and serves the JSON API under `/api`.
//!
//! # One-shot import
//!
//! ```text
//! querydesk import queries.csv
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use clap::{Parser, Subcommand};
use querydesk_api::ApiState;
use querydesk_core::{
  Error as CoreError,
  import::{self, ImportReport},
  store::{QueryStore, SourceCatalog},
};
use querydesk_store_sqlite::{SqliteCatalog, SqliteStore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "querydesk data-query review server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "querydesk.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Import a query sheet into the store and print the report.
  Import {
    /// CSV or workbook file to import.
    path: PathBuf,
  },
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

  let cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;
  cfg
    .resolver
    .validate()
    .context("invalid [resolver] configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg, store).await,
    Command::Import { path } => import_file(&store, &path).await,
  }
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let catalog = match &cfg.source_path {
    Some(path) => {
      let path = expand_tilde(path);
      SqliteCatalog::open_read_only(&path)
        .await
        .with_context(|| format!("failed to open source forms at {path:?}"))?
    }
    None => store.catalog(),
  };

  let state = Arc::new(ApiState { store, catalog, forms: cfg.resolver.clone() });
  let app = router(state);

  let address = format!("{}:{}", cfg.host, cfg.port);
  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

fn router<S, C>(state: Arc<ApiState<S, C>>) -> Router
where
  S: QueryStore + 'static,
  C: SourceCatalog + 'static,
{
  Router::new()
    .nest("/api", querydesk_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

async fn import_file(store: &SqliteStore, path: &std::path::Path) -> anyhow::Result<()> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read {path:?}"))?;
  let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
  let table = querydesk_sheet::read_upload(&name, &bytes)
    .with_context(|| format!("failed to decode {path:?}"))?;

  let report = match import::stage(&table) {
    Ok(plan) => store.import_batch(plan).await.context("import failed")?,
    Err(CoreError::SchemaMismatch(missing)) => ImportReport::rejected(missing),
    Err(e) => return Err(e).context("import failed"),
  };

  println!("{}", serde_json::to_string_pretty(&report)?);
  if let Some(missing) = &report.missing_columns {
    anyhow::bail!("sheet is missing required columns: {}", missing.join(", "));
  }
  Ok(())
}
