//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies pragmas, creates every
//! table with `CREATE TABLE IF NOT EXISTS` and then runs the versioned
//! migrations. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// A single connection is used so every query sees the same database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_schema_version_table(pool).await?;

    // Parliament structure
    create_knessets_table(pool).await?;
    create_parties_table(pool).await?;
    create_members_table(pool).await?;
    create_memberships_table(pool).await?;
    create_awards_tables(pool).await?;

    // Committees
    create_persons_tables(pool).await?;
    create_lobbyists_tables(pool).await?;
    create_committees_tables(pool).await?;
    create_committee_meetings_tables(pool).await?;

    // Plenum
    create_votes_tables(pool).await?;
    create_bills_tables(pool).await?;

    // Derived data
    create_weekly_presence_table(pool).await?;
    create_correlations_table(pool).await?;

    // Site users and tagging
    create_users_tables(pool).await?;
    create_tags_tables(pool).await?;

    Ok(())
}

async fn execute_all(pool: &SqlitePool, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_knessets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knessets (
            number INTEGER PRIMARY KEY,
            start_date TEXT,
            end_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parties_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS parties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                is_coalition INTEGER NOT NULL DEFAULT 0,
                number_of_members INTEGER,
                number_of_seats INTEGER,
                knesset_id INTEGER REFERENCES knessets(number),
                split_from INTEGER REFERENCES parties(id),
                UNIQUE (knesset_id, name)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS party_seats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                party_id INTEGER NOT NULL REFERENCES parties(id) ON DELETE CASCADE,
                start_date TEXT NOT NULL,
                end_date TEXT,
                number_of_seats INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS coalition_memberships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                party_id INTEGER NOT NULL REFERENCES parties(id) ON DELETE CASCADE,
                start_date TEXT,
                end_date TEXT
            )
            "#,
        ],
    )
    .await
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS members (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                current_party_id INTEGER REFERENCES parties(id),
                current_position INTEGER NOT NULL DEFAULT 999,
                start_date TEXT,
                end_date TEXT,
                img_url TEXT NOT NULL DEFAULT '',
                phone TEXT,
                fax TEXT,
                email TEXT,
                website TEXT,
                family_status TEXT,
                number_of_children INTEGER,
                date_of_birth TEXT,
                place_of_birth TEXT,
                date_of_death TEXT,
                year_of_aliyah INTEGER,
                is_current INTEGER NOT NULL DEFAULT 1,
                place_of_residence TEXT,
                area_of_residence TEXT,
                gender TEXT,
                current_role_descriptions TEXT,
                bills_stats_proposed INTEGER NOT NULL DEFAULT 0,
                bills_stats_pre INTEGER NOT NULL DEFAULT 0,
                bills_stats_first INTEGER NOT NULL DEFAULT 0,
                bills_stats_approved INTEGER NOT NULL DEFAULT 0,
                average_weekly_presence_hours REAL,
                average_monthly_committee_presence REAL,
                backlinks_enabled INTEGER NOT NULL DEFAULT 1
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_members_is_current ON members(is_current)",
            r#"
            CREATE TABLE IF NOT EXISTS member_altnames (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                name TEXT NOT NULL
            )
            "#,
        ],
    )
    .await
}

async fn create_memberships_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS memberships (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
            party_id INTEGER NOT NULL REFERENCES parties(id) ON DELETE CASCADE,
            start_date TEXT,
            end_date TEXT,
            position INTEGER NOT NULL DEFAULT 999
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_awards_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS award_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                valence REAL NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS awards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                award_type_id INTEGER NOT NULL REFERENCES award_types(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                date_given TEXT NOT NULL,
                reference TEXT NOT NULL DEFAULT ''
            )
            "#,
        ],
    )
    .await
}

async fn create_persons_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS titles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS persons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                member_id INTEGER REFERENCES members(id) ON DELETE SET NULL,
                gender TEXT,
                email TEXT,
                img_url TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS person_titles (
                person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
                title_id INTEGER NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
                PRIMARY KEY (person_id, title_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS person_aliases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                UNIQUE (person_id, name)
            )
            "#,
        ],
    )
    .await
}

async fn create_lobbyists_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS lobbyists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                person_id INTEGER REFERENCES persons(id) ON DELETE SET NULL,
                description TEXT,
                image_url TEXT,
                large_image_url TEXT,
                source_id TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS lobbyist_corporations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                description TEXT,
                source_id TEXT
            )
            "#,
        ],
    )
    .await
}

async fn create_committees_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS committees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                name_eng TEXT,
                name_arb TEXT,
                description TEXT,
                hide INTEGER NOT NULL DEFAULT 0,
                type TEXT NOT NULL DEFAULT 'committee',
                knesset_id INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS committee_members (
                committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (committee_id, member_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS committee_chairpersons (
                committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (committee_id, member_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS committee_replacements (
                committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (committee_id, member_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_committee_meetings_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS committee_meetings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                datetime TEXT,
                date_string TEXT NOT NULL DEFAULT '',
                topics TEXT,
                protocol_text TEXT,
                src_url TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_committee_meetings_date ON committee_meetings(date)",
            r#"
            CREATE TABLE IF NOT EXISTS committee_meeting_members (
                meeting_id INTEGER NOT NULL REFERENCES committee_meetings(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (meeting_id, member_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS committee_meeting_lobbyists (
                meeting_id INTEGER NOT NULL REFERENCES committee_meetings(id) ON DELETE CASCADE,
                lobbyist_id INTEGER NOT NULL REFERENCES lobbyists(id) ON DELETE CASCADE,
                PRIMARY KEY (meeting_id, lobbyist_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS committee_meeting_corporations (
                meeting_id INTEGER NOT NULL REFERENCES committee_meetings(id) ON DELETE CASCADE,
                corporation_id INTEGER NOT NULL REFERENCES lobbyist_corporations(id) ON DELETE CASCADE,
                PRIMARY KEY (meeting_id, corporation_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS committee_meeting_attendees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id INTEGER NOT NULL REFERENCES committee_meetings(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                additional_information TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS protocol_parts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id INTEGER NOT NULL REFERENCES committee_meetings(id) ON DELETE CASCADE,
                "order" INTEGER NOT NULL,
                header TEXT,
                body TEXT,
                type TEXT,
                speaker_id INTEGER REFERENCES persons(id) ON DELETE SET NULL
            )
            "#,
        ],
    )
    .await
}

async fn create_votes_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                vote_type TEXT NOT NULL DEFAULT '',
                time TEXT NOT NULL,
                time_string TEXT NOT NULL DEFAULT '',
                meeting_number INTEGER,
                vote_number INTEGER,
                src_url TEXT,
                summary TEXT,
                full_text TEXT,
                votes_count INTEGER,
                for_votes_count INTEGER,
                against_votes_count INTEGER,
                abstain_votes_count INTEGER,
                against_party INTEGER,
                against_coalition INTEGER,
                against_opposition INTEGER,
                against_own_bill INTEGER,
                controversy INTEGER,
                importance REAL NOT NULL DEFAULT 0.0
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_votes_time ON votes(time)",
            r#"
            CREATE TABLE IF NOT EXISTS vote_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vote_id INTEGER NOT NULL REFERENCES votes(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                party_id INTEGER NOT NULL REFERENCES parties(id),
                type TEXT NOT NULL,
                against_party INTEGER NOT NULL DEFAULT 0,
                against_coalition INTEGER NOT NULL DEFAULT 0,
                against_opposition INTEGER NOT NULL DEFAULT 0,
                against_own_bill INTEGER NOT NULL DEFAULT 0,
                UNIQUE (vote_id, member_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_bills_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS bills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                popular_name TEXT NOT NULL DEFAULT '',
                stage TEXT NOT NULL DEFAULT '?',
                stage_date TEXT,
                knesset_proposal_date TEXT,
                gov_proposal_date TEXT,
                first_vote_id INTEGER REFERENCES votes(id) ON DELETE SET NULL,
                approval_vote_id INTEGER REFERENCES votes(id) ON DELETE SET NULL,
                knesset_booklet INTEGER,
                gov_booklet INTEGER
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_bills_stage_date ON bills(stage_date)",
            r#"
            CREATE TABLE IF NOT EXISTS bill_joiners (
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (bill_id, member_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS bill_proposers (
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (bill_id, member_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS bill_pre_votes (
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                vote_id INTEGER NOT NULL REFERENCES votes(id) ON DELETE CASCADE,
                PRIMARY KEY (bill_id, vote_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS bill_committee_meetings (
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                meeting_id INTEGER NOT NULL REFERENCES committee_meetings(id) ON DELETE CASCADE,
                reading INTEGER NOT NULL,
                PRIMARY KEY (bill_id, meeting_id, reading)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS private_proposals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                proposal_id INTEGER,
                bill_id INTEGER REFERENCES bills(id) ON DELETE SET NULL,
                date TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS private_proposal_proposers (
                proposal_id INTEGER NOT NULL REFERENCES private_proposals(id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (proposal_id, member_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_weekly_presence_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weekly_presence (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
            date TEXT,
            hours REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_correlations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS correlations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            m1_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
            m2_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
            score INTEGER NOT NULL DEFAULT 0,
            normalized_score REAL,
            not_same_party INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL
            )
            "#,
        ],
    )
    .await
}

async fn create_tags_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tagged_votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                vote_id INTEGER NOT NULL REFERENCES votes(id) ON DELETE CASCADE,
                UNIQUE (tag_id, vote_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tag_votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tagged_item_id INTEGER NOT NULL REFERENCES tagged_votes(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                vote INTEGER NOT NULL DEFAULT 0,
                UNIQUE (tagged_item_id, user_id)
            )
            "#,
        ],
    )
    .await
}
