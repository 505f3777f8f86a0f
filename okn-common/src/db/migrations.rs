//! Database schema migrations
//!
//! Versioned, idempotent upgrades for databases created by older releases.
//! Tables are created in their current shape by [`crate::db::init`]; the
//! migrations below only patch tables that already existed in an older shape.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the wild depend on them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every migration must be safe to re-run
//! 4. **Use ALTER TABLE** - prefer adding columns over DROP/CREATE

use crate::db::votes::VoteType;
use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 4;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
        info!("✓ Migration v3 completed");
    }

    if current_version < 4 {
        migrate_v4(pool).await?;
        set_schema_version(pool, 4).await?;
        info!("✓ Migration v4 completed");
    }

    Ok(())
}

/// Migration v1: party lineage (`parties.split_from`)
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !table_exists(pool, "parties").await? {
        return Ok(());
    }

    if column_exists(pool, "parties", "split_from").await? {
        return Ok(());
    }

    sqlx::query("ALTER TABLE parties ADD COLUMN split_from INTEGER REFERENCES parties(id)")
        .execute(pool)
        .await?;

    info!("  ✓ Added split_from column to parties table");
    Ok(())
}

/// Migration v2: cached committee presence on members
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    if !table_exists(pool, "members").await? {
        return Ok(());
    }

    if column_exists(pool, "members", "average_monthly_committee_presence").await? {
        return Ok(());
    }

    sqlx::query("ALTER TABLE members ADD COLUMN average_monthly_committee_presence REAL")
        .execute(pool)
        .await?;

    info!("  ✓ Added average_monthly_committee_presence column to members table");
    Ok(())
}

/// Migration v3: classify votes imported before `vote_type` was filled in
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    if !table_exists(pool, "votes").await? {
        return Ok(());
    }

    let unclassified: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, title FROM votes WHERE vote_type = ''")
            .fetch_all(pool)
            .await?;

    let mut classified = 0;
    for (id, title) in unclassified {
        if let Some(vote_type) = VoteType::classify_title(&title) {
            sqlx::query("UPDATE votes SET vote_type = ? WHERE id = ?")
                .bind(vote_type.as_str())
                .bind(id)
                .execute(pool)
                .await?;
            classified += 1;
        }
    }

    if classified > 0 {
        info!("  ✓ Classified {} votes by title", classified);
    }
    Ok(())
}

/// Migration v4: booklet numbers of the knesset and government proposals
async fn migrate_v4(pool: &SqlitePool) -> Result<()> {
    if !table_exists(pool, "bills").await? {
        return Ok(());
    }

    for column in ["knesset_booklet", "gov_booklet"] {
        if column_exists(pool, "bills", column).await? {
            continue;
        }
        sqlx::query(&format!("ALTER TABLE bills ADD COLUMN {} INTEGER", column))
            .execute(pool)
            .await?;
        info!("  ✓ Added {} column to bills table", column);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn legacy_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in [
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
            "CREATE TABLE parties (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
            "CREATE TABLE members (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            "CREATE TABLE votes (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, vote_type TEXT NOT NULL DEFAULT '', time TEXT NOT NULL)",
            "CREATE TABLE bills (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, stage TEXT NOT NULL DEFAULT '?')",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_migrations_patch_legacy_tables() {
        let pool = legacy_pool().await;
        sqlx::query("INSERT INTO votes (title, time) VALUES ('הצעת אי-אמון בממשלה', '2014-01-01 10:00:00')")
            .execute(&pool)
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();

        assert!(column_exists(&pool, "parties", "split_from").await.unwrap());
        assert!(column_exists(&pool, "members", "average_monthly_committee_presence")
            .await
            .unwrap());
        let vote_type: String = sqlx::query_scalar("SELECT vote_type FROM votes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(vote_type, "no-confidence");
        assert!(column_exists(&pool, "bills", "knesset_booklet").await.unwrap());
        assert!(column_exists(&pool, "bills", "gov_booklet").await.unwrap());
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = legacy_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, CURRENT_SCHEMA_VERSION as i64);
    }
}
