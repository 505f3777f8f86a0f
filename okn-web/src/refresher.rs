//! Periodic statistics refresh
//!
//! One background task recomputes every member's cached statistics and drops
//! expired login sessions on a fixed interval.

use okn_common::db::users::purge_expired_sessions;
use okn_common::stats::{refresh_all, BillStatsStrategy};
use okn_common::time;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Run one refresh pass, logging instead of failing
pub async fn refresh_once(pool: &SqlitePool, strategy: BillStatsStrategy) {
    match refresh_all(pool, strategy, time::today()).await {
        Ok(summary) => debug!("Statistics refresh done: {:?}", summary),
        Err(e) => warn!("Statistics refresh failed: {}", e),
    }

    match purge_expired_sessions(pool, time::now()).await {
        Ok(0) => {}
        Ok(purged) => debug!("Purged {} expired sessions", purged),
        Err(e) => warn!("Session purge failed: {}", e),
    }
}

/// Start the refresher; `None` when `interval_secs` is 0
///
/// The first pass runs immediately.
pub fn spawn_stats_refresher(
    pool: SqlitePool,
    interval_secs: u64,
    strategy: BillStatsStrategy,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Statistics refresher disabled");
        return None;
    }

    info!(
        "Starting statistics refresher (interval: {}s, strategy: {:?})",
        interval_secs, strategy
    );

    Some(tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(interval_secs));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            refresh_once(&pool, strategy).await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use okn_common::db::init_memory_database;

    #[tokio::test]
    async fn test_zero_interval_disables_refresher() {
        let pool = init_memory_database().await.unwrap();
        assert!(spawn_stats_refresher(pool, 0, BillStatsStrategy::default()).is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_knesset_is_harmless() {
        let pool = init_memory_database().await.unwrap();
        refresh_once(&pool, BillStatsStrategy::StageDate).await;
    }

    #[tokio::test]
    async fn test_refresher_runs_in_background() {
        let pool = init_memory_database().await.unwrap();
        let handle = spawn_stats_refresher(pool, 3600, BillStatsStrategy::default()).unwrap();
        assert!(!handle.is_finished());
        handle.abort();
    }
}
