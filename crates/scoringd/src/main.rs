//! Scoring Daemon - schema-validated method-call API
//!
//! Serves `online_score` and `client_instrests` over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use scoringd::auth::AuthSettings;
use scoringd::config::{Config, CONFIG_PATH};
use scoringd::server::{self, AppState};
use scoringd::{MemoryStore, MethodApi};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scoring API daemon
#[derive(Parser)]
#[command(name = "scoringd")]
#[command(about = "Scoring API - validated method calls over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Append logs to this file instead of stderr
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

fn init_logging(log: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

fn build_store(config: &Config) -> Result<MemoryStore> {
    let store = MemoryStore::new(config.store.cache_capacity);
    if let Some(seed) = &config.store.seed_path {
        store
            .seed_from_file(seed)
            .context("Failed to seed store")?;
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    info!("Scoring Daemon v{} starting", scoring_shared::VERSION);

    let mut config = Config::load_or_default(&cli.config);
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let store = Arc::new(build_store(&config)?);
    let auth: AuthSettings = config.auth.clone();
    let api = MethodApi::new(auth, store);
    info!(
        "Methods: {:?}",
        api.registry()
            .methods()
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
    );

    server::run(&config.server, AppState::new(api)).await
}
