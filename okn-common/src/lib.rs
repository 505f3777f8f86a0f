//! # Open Knesset Watch common library
//!
//! Shared code for the okn-web server and the okn-admin tool:
//! - Database schema, migrations and per-entity queries
//! - Member statistics (bill stages, presence, committee activity)
//! - Bootstrap configuration and root folder resolution
//! - Password hashing and session tokens
//! - Common error type

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod stats;
pub mod time;

pub use error::{Error, Result};
