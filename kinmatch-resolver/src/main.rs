//! kinmatch-resolver - Genealogical record matching service
//!
//! Searches external genealogy sources for records that may describe a known
//! person, scores each candidate and remembers the candidates a user rejects.

use anyhow::{Context, Result};
use clap::Parser;
use kinmatch_common::config::TomlConfig;
use kinmatch_common::logging::init_tracing;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use kinmatch_resolver::{build_router, AppState, MatchPipeline};

/// Command-line arguments for kinmatch-resolver
#[derive(Parser, Debug)]
#[command(name = "kinmatch-resolver")]
#[command(about = "Genealogical record matching service")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "KINMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind (overrides server.host)
    #[arg(long, env = "KINMATCH_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long, env = "KINMATCH_PORT")]
    port: Option<u16>,

    /// SQLite file for the rejection ledger (overrides database.path)
    #[arg(long, env = "KINMATCH_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = Some(database);
    }

    init_tracing(&config.logging)?;

    info!("Starting kinmatch-resolver");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = kinmatch_resolver::db::init_database_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database connection established");

    let pipeline = MatchPipeline::from_config(&config, db_pool.clone())?;
    info!(
        providers = ?pipeline.aggregator().provider_states(),
        generative = pipeline.orchestrator().has_generator(),
        "Match pipeline ready"
    );

    let state = AppState::new(db_pool, pipeline);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("kinmatch-resolver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
