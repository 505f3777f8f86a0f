//! Recalculate cached member statistics
//!
//! Every `recalc_*` function loads what it needs, computes with the pure
//! helpers and writes the result onto the member row.

use crate::db::bills::{proposer_ids, update_stage, Bill};
use crate::db::committees::count_meetings_attended;
use crate::db::knessets::{current_knesset, Knesset};
use crate::db::members::{
    get_member, list_members, set_average_weekly_presence, update_cached_stats, CachedStats, Member,
};
use crate::db::presence::{insert_weekly_presence, presence_hours_since, WeeklyPresence};
use crate::stats::bills::member_bill_counts;
use crate::stats::presence::{average_weekly_presence, committee_meetings_per_month, service_time};
use crate::stats::BillStatsStrategy;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Outcome of a full refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub members: usize,
    pub failed: usize,
}

async fn require_current_knesset(pool: &SqlitePool) -> Result<Knesset> {
    current_knesset(pool)
        .await?
        .ok_or_else(|| Error::NotFound("current knesset".to_string()))
}

/// Compute every cached statistic of a member without persisting it
pub async fn compute_member_stats(
    pool: &SqlitePool,
    member: &Member,
    knesset: &Knesset,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<CachedStats> {
    let Some(member_id) = member.id else {
        return Ok(CachedStats::default());
    };

    let bills = member_bill_counts(pool, member_id, knesset, strategy, today).await?;
    let since = knesset.effective_start();
    let hours = presence_hours_since(pool, member_id, since).await?;
    let meetings = count_meetings_attended(pool, member_id, since).await?;
    let service_days = service_time(member, knesset, today);

    Ok(CachedStats {
        bills_stats_proposed: bills.proposed,
        bills_stats_pre: bills.pre,
        bills_stats_first: bills.first,
        bills_stats_approved: bills.approved,
        average_weekly_presence_hours: average_weekly_presence(&hours),
        average_monthly_committee_presence: Some(committee_meetings_per_month(
            member,
            meetings,
            service_days,
        )),
    })
}

async fn recalc_loaded(
    pool: &SqlitePool,
    member: &Member,
    knesset: &Knesset,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<CachedStats> {
    let stats = compute_member_stats(pool, member, knesset, strategy, today).await?;
    if let Some(member_id) = member.id {
        update_cached_stats(pool, member_id, &stats).await?;
        debug!("Recalculated statistics for member {}", member_id);
    }
    Ok(stats)
}

/// Recalculate and persist all statistics of one member
pub async fn recalc_member(
    pool: &SqlitePool,
    member_id: i64,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<CachedStats> {
    let knesset = require_current_knesset(pool).await?;
    let member = get_member(pool, member_id).await?;
    recalc_loaded(pool, &member, &knesset, strategy, today).await
}

/// Recalculate and persist only the weekly presence average
pub async fn recalc_presence(pool: &SqlitePool, member_id: i64) -> Result<Option<f64>> {
    let knesset = require_current_knesset(pool).await?;
    let hours = presence_hours_since(pool, member_id, knesset.effective_start()).await?;
    let average = average_weekly_presence(&hours);
    set_average_weekly_presence(pool, member_id, average).await?;
    Ok(average)
}

/// Store a weekly presence row and refresh the member's presence average
pub async fn record_weekly_presence(pool: &SqlitePool, presence: &WeeklyPresence) -> Result<Option<f64>> {
    insert_weekly_presence(pool, presence).await?;
    recalc_presence(pool, presence.member_id).await
}

/// Re-derive a bill's stage and refresh the statistics of its proposers
pub async fn refresh_bill(
    pool: &SqlitePool,
    bill_id: i64,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<Bill> {
    let bill = update_stage(pool, bill_id, false).await?;
    for member_id in proposer_ids(pool, bill_id).await? {
        recalc_member(pool, member_id, strategy, today).await?;
    }
    Ok(bill)
}

/// Recalculate every member
///
/// A failure on one member is logged and counted; the refresh continues.
/// Without any knesset there is nothing to compute.
pub async fn refresh_all(
    pool: &SqlitePool,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<RefreshSummary> {
    let Some(knesset) = current_knesset(pool).await? else {
        warn!("No knesset records, skipping statistics refresh");
        return Ok(RefreshSummary::default());
    };

    let members = list_members(pool).await?;
    let mut summary = RefreshSummary::default();
    for member in &members {
        match recalc_loaded(pool, member, &knesset, strategy, today).await {
            Ok(_) => summary.members += 1,
            Err(e) => {
                warn!("Failed to recalculate member {:?}: {}", member.id, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Refreshed statistics for {} members ({} failed) in {}",
        summary.members,
        summary.failed,
        knesset.name()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bills::{add_pre_vote, load_bill, save_bill, save_private_proposal, BillStage, PrivateProposal};
    use crate::db::committees::{add_attending_member, save_committee, save_meeting, Committee, CommitteeMeeting};
    use crate::db::init::init_memory_database;
    use crate::db::knessets::save_knesset;
    use crate::db::members::save_member;
    use crate::db::votes::{save_vote, Vote};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn pool_with_knesset() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        save_knesset(&pool, &Knesset::new(19, Some(date(2013, 2, 5)), None))
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_member_without_service_or_presence() {
        let pool = pool_with_knesset().await;
        save_member(&pool, &Member::new(Some(1), "Newcomer")).await.unwrap();

        let stats = recalc_member(&pool, 1, BillStatsStrategy::default(), date(2014, 1, 1))
            .await
            .unwrap();
        assert_eq!(stats.average_monthly_committee_presence, Some(0.0));
        assert_eq!(stats.average_weekly_presence_hours, None);

        let stored = get_member(&pool, 1).await.unwrap();
        assert_eq!(stored.stats, stats);
    }

    #[tokio::test]
    async fn test_meetings_per_month_persisted() {
        let pool = pool_with_knesset().await;
        let mut member = Member::new(Some(1), "Active");
        member.start_date = Some(date(2013, 2, 5));
        save_member(&pool, &member).await.unwrap();

        let committee = save_committee(&pool, &Committee::new("Finance")).await.unwrap();
        for day in [date(2013, 3, 1), date(2013, 3, 8), date(2012, 1, 1)] {
            let meeting = save_meeting(&pool, &CommitteeMeeting::new(committee, day))
                .await
                .unwrap();
            add_attending_member(&pool, meeting, 1).await.unwrap();
        }

        // 60 days after the knesset opened
        let stats = recalc_member(&pool, 1, BillStatsStrategy::default(), date(2013, 4, 6))
            .await
            .unwrap();
        assert_eq!(stats.average_monthly_committee_presence, Some(1.0));
    }

    #[tokio::test]
    async fn test_record_presence_updates_average() {
        let pool = pool_with_knesset().await;
        save_member(&pool, &Member::new(Some(1), "Present")).await.unwrap();

        for (day, hours) in [(date(2013, 3, 4), 10.0), (date(2013, 3, 11), 11.5)] {
            record_weekly_presence(
                &pool,
                &WeeklyPresence {
                    member_id: 1,
                    date: Some(day),
                    hours,
                },
            )
            .await
            .unwrap();
        }

        let member = get_member(&pool, 1).await.unwrap();
        assert_eq!(member.stats.average_weekly_presence_hours, Some(10.8));
    }

    #[tokio::test]
    async fn test_refresh_all() {
        let pool = init_memory_database().await.unwrap();
        save_member(&pool, &Member::new(Some(1), "A")).await.unwrap();
        assert_eq!(
            refresh_all(&pool, BillStatsStrategy::default(), date(2014, 1, 1))
                .await
                .unwrap(),
            RefreshSummary::default()
        );
        assert!(recalc_member(&pool, 1, BillStatsStrategy::default(), date(2014, 1, 1))
            .await
            .unwrap_err()
            .is_not_found());

        save_knesset(&pool, &Knesset::new(19, Some(date(2013, 2, 5)), None))
            .await
            .unwrap();
        save_member(&pool, &Member::new(Some(2), "B")).await.unwrap();
        let summary = refresh_all(&pool, BillStatsStrategy::StageDate, date(2014, 1, 1))
            .await
            .unwrap();
        assert_eq!(summary.members, 2);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_refresh_bill_updates_proposer_counts() {
        let pool = pool_with_knesset().await;
        save_member(&pool, &Member::new(Some(1), "Proposer")).await.unwrap();
        let bill_id = save_bill(&pool, &Bill::new("Transparency bill")).await.unwrap();
        save_private_proposal(
            &pool,
            &PrivateProposal {
                id: None,
                proposal_id: Some(1200),
                bill_id: Some(bill_id),
                date: date(2013, 3, 1),
                title: "Transparency bill".to_string(),
            },
            &[1],
        )
        .await
        .unwrap();

        let today = date(2014, 1, 1);
        let bill = refresh_bill(&pool, bill_id, BillStatsStrategy::ProposalDate, today)
            .await
            .unwrap();
        assert_eq!(bill.stage, BillStage::Proposed);
        let stats = get_member(&pool, 1).await.unwrap().stats;
        assert_eq!((stats.bills_stats_proposed, stats.bills_stats_pre), (1, 0));

        let mut pre_vote = Vote::new(
            "הצעת חוק השקיפות - קריאה טרומית",
            date(2013, 5, 15).and_hms_opt(12, 0, 0).unwrap(),
        );
        pre_vote.for_votes_count = Some(40);
        pre_vote.against_votes_count = Some(12);
        let vote_id = save_vote(&pool, &pre_vote).await.unwrap();
        add_pre_vote(&pool, bill_id, vote_id).await.unwrap();

        let bill = refresh_bill(&pool, bill_id, BillStatsStrategy::ProposalDate, today)
            .await
            .unwrap();
        assert_eq!(bill.stage, BillStage::PreApproved);
        assert_eq!(
            load_bill(&pool, bill_id).await.unwrap().unwrap().stage,
            BillStage::PreApproved
        );
        let stats = get_member(&pool, 1).await.unwrap().stats;
        assert_eq!((stats.bills_stats_proposed, stats.bills_stats_pre), (1, 1));

        assert!(refresh_bill(&pool, 999, BillStatsStrategy::ProposalDate, today)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
