//! okn-web - Open Knesset Watch HTTP server
//!
//! Serves the vote listing, tagging and record endpoints over one SQLite
//! database, and keeps member statistics fresh in the background.

use anyhow::{Context, Result};
use clap::Parser;
use okn_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use okn_common::db::init_database;
use okn_web::refresher::spawn_stats_refresher;
use okn_web::{build_router, AppState};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "okn-web", version, about = "Open Knesset Watch HTTP server")]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "OKN_PORT")]
    port: Option<u16>,

    /// Folder holding the database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config locations)
    #[arg(short, long, env = "OKN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the configured level
    let config = TomlConfig::load_or_default(args.config.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting Open Knesset Watch (okn-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("okn-web")
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder).with_database_file(&config.database_file);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    spawn_stats_refresher(
        pool.clone(),
        config.stats.refresh_interval_secs,
        config.stats.bill_strategy,
    );

    let addr = format!("{}:{}", config.bind_address, args.port.unwrap_or(config.port));
    let app = build_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("okn-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
