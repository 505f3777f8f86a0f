//! okn-web library - HTTP surface of Open Knesset Watch
//!
//! Read endpoints for members, parties, committees, votes, bills and
//! lobbyists, the faceted vote listing, and login-protected vote tagging.

use axum::Router;
use chrono::Duration;
use okn_common::config::TomlConfig;
use okn_common::stats::BillStatsStrategy;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod listing;
pub mod pagination;
pub mod refresher;

/// Longest session lifetime; larger configured values are clamped
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn bill_strategy(&self) -> BillStatsStrategy {
        self.config.stats.bill_strategy
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.config.auth.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let votes = Router::new()
        .route("/vote", get(api::list_votes))
        .route("/vote/", get(api::list_votes))
        .route("/vote/tagged/:tag", get(api::tagged_votes))
        .route("/vote/:id", get(api::vote_detail))
        .route("/vote/:id/tags", post(api::submit_tags))
        .route("/vote/:id/tags/:tag_id/vote/:value", post(api::vote_on_tag));

    let records = Router::new()
        .route("/api/members", get(api::list_members))
        .route("/api/members/:id", get(api::member_detail))
        .route("/api/parties", get(api::list_parties))
        .route("/api/parties/:id", get(api::party_detail))
        .route("/api/bills", get(api::list_bills))
        .route("/api/bills/:id", get(api::bill_detail))
        .route("/api/committees/:id/meetings", get(api::committee_meetings))
        .route("/api/meetings/:id", get(api::meeting_detail))
        .route("/api/lobbyists", get(api::list_lobbyists));

    let session = Router::new()
        .route("/login", get(api::login_page).post(api::login))
        .route("/logout", post(api::logout));

    Router::new()
        .merge(votes)
        .merge(records)
        .merge(session)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use okn_common::db::init_memory_database;

    async fn state_with_ttl(hours: i64) -> AppState {
        let mut config = TomlConfig::default();
        config.auth.session_ttl_hours = hours;
        AppState::new(init_memory_database().await.unwrap(), config)
    }

    #[tokio::test]
    async fn test_session_ttl_is_clamped() {
        assert_eq!(state_with_ttl(12).await.session_ttl(), Duration::hours(12));
        assert_eq!(state_with_ttl(0).await.session_ttl(), Duration::hours(1));
        assert_eq!(state_with_ttl(-5).await.session_ttl(), Duration::hours(1));

        let ttl = state_with_ttl(i64::MAX).await.session_ttl();
        assert_eq!(ttl, Duration::hours(MAX_SESSION_TTL_HOURS));
        assert!(okn_common::time::now().checked_add_signed(ttl).is_some());
    }
}
