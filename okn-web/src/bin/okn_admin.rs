//! okn-admin - maintenance commands for an Open Knesset Watch database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use okn_common::auth::hash_password;
use okn_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use okn_common::db::init_database;
use okn_common::db::users::create_user;
use okn_common::stats::{recalc_member, refresh_all, refresh_bill};
use okn_common::time;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "okn-admin", version, about = "Open Knesset Watch maintenance")]
struct Args {
    /// Folder holding the database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config locations)
    #[arg(short, long, global = true, env = "OKN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recalculate cached member statistics
    RecalcStats {
        /// Only this member
        #[arg(long, conflicts_with = "bill")]
        member: Option<i64>,

        /// Re-derive this bill's stage, then recalculate its proposers
        #[arg(long)]
        bill: Option<i64>,
    },
    /// Create a site user
    CreateUser { name: String, password: String },
    /// Create the database and apply migrations
    InitDb,
}

async fn open_database(config: &TomlConfig, root_folder: Option<PathBuf>) -> Result<SqlitePool> {
    let root_folder = RootFolderResolver::new("okn-admin")
        .with_cli_arg(root_folder)
        .with_toml(config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder).with_database_file(&config.database_file);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
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

    let pool = open_database(&config, args.root_folder).await?;
    let strategy = config.stats.bill_strategy;

    match args.command {
        Command::RecalcStats { bill: Some(id), .. } => {
            let bill = refresh_bill(&pool, id, strategy, time::today())
                .await
                .with_context(|| format!("Failed to refresh bill {}", id))?;
            info!("Bill {} is at stage {}", id, bill.stage.code());
        }
        Command::RecalcStats { member: Some(id), .. } => {
            let stats = recalc_member(&pool, id, strategy, time::today())
                .await
                .with_context(|| format!("Failed to recalculate member {}", id))?;
            info!("Member {}: {:?}", id, stats);
        }
        Command::RecalcStats { member: None, bill: None } => {
            let summary = refresh_all(&pool, strategy, time::today())
                .await
                .context("Statistics refresh failed")?;
            info!("Recalculated {} members ({} failed)", summary.members, summary.failed);
        }
        Command::CreateUser { name, password } => {
            let hash = hash_password(&password)?;
            let user = create_user(&pool, &name, &hash).await?;
            info!("Created user '{}' (id {})", user.username, user.id);
        }
        Command::InitDb => {
            info!("Database ready");
        }
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recalc_stats_for_one_bill() {
        let args = Args::try_parse_from(["okn-admin", "recalc-stats", "--bill", "7"]).unwrap();
        assert!(matches!(
            args.command,
            Command::RecalcStats { member: None, bill: Some(7) }
        ));

        assert!(Args::try_parse_from(["okn-admin", "recalc-stats", "--bill", "7", "--member", "1"]).is_err());
    }
}
