//! freight-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.
//!
//! # Maintenance
//!
//! ```text
//! freight-server repair-hierarchy
//! freight-server seed-policy policy.toml
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use freight_core::store::MarketStore;
use freight_server::{
  BroadcastNotifier, PolicySeed, ServerConfig, build_engine, log_events,
  seed_policy,
};
use freight_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const EVENT_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(author, version, about = "Freight contract engine server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Break any cycles in the job and contract parent chains.
  RepairHierarchy,
  /// Upsert role assignments and commission rates from a TOML file.
  SeedPolicy {
    /// Path to the policy seed file.
    file: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FREIGHT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(dir) = store_path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {dir:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::RepairHierarchy => {
      let report = store
        .repair_hierarchy()
        .await
        .context("hierarchy repair failed")?;
      tracing::info!(
        severed_jobs = report.severed_jobs.len(),
        severed_contracts = report.severed_contracts.len(),
        "hierarchy repair finished"
      );
      for job_id in &report.severed_jobs {
        println!("job {job_id}");
      }
      for contract_id in &report.severed_contracts {
        println!("contract {contract_id}");
      }
      Ok(())
    }
    Command::SeedPolicy { file } => {
      let seed: PolicySeed = config::Config::builder()
        .add_source(config::File::from(file.as_path()))
        .build()
        .and_then(config::Config::try_deserialize::<PolicySeed>)
        .with_context(|| format!("failed to read policy seed {file:?}"))?;
      let (roles, rates) = (seed.roles.len(), seed.commissions.len());
      seed_policy(&store, seed)
        .await
        .context("failed to seed policy tables")?;
      tracing::info!(roles, rates, "policy seeded");
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let notifier = BroadcastNotifier::new(EVENT_CAPACITY);
  tokio::spawn(log_events(notifier.subscribe()));

  let engine = Arc::new(build_engine(store, server_cfg, notifier));
  let app = freight_server::router(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

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
