//! Database schema and per-entity queries

pub mod awards;
pub mod bills;
pub mod committees;
pub mod correlations;
pub mod init;
pub mod knessets;
pub mod lobbyists;
pub mod members;
pub mod migrations;
pub mod parties;
pub mod presence;
pub mod tags;
pub mod users;
pub mod votes;

pub use init::{init_database, init_memory_database};
pub use migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
