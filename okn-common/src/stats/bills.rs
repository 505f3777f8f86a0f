//! Bill counts by stage group

use crate::db::bills::{
    member_bill_stages_by_proposal_date, member_bill_stages_by_stage_date, BillStage, StageGroup,
};
use crate::db::knessets::Knesset;
use crate::stats::BillStatsStrategy;
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

/// Bill counts of one member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BillStageCounts {
    pub proposed: i64,
    pub pre: i64,
    pub first: i64,
    pub approved: i64,
}

impl BillStageCounts {
    /// Count the stages of a member's bills into the stage groups
    pub fn from_stages(stages: &[BillStage]) -> Self {
        let count = |group: StageGroup| stages.iter().filter(|s| group.contains(**s)).count() as i64;
        Self {
            proposed: stages.len() as i64,
            pre: count(StageGroup::Pre),
            first: count(StageGroup::First),
            approved: count(StageGroup::Approved),
        }
    }
}

/// Stages of the member's bills attributed to the knesset under the strategy
pub async fn member_bill_stages(
    pool: &SqlitePool,
    member_id: i64,
    knesset: &Knesset,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<Vec<BillStage>> {
    match strategy {
        BillStatsStrategy::ProposalDate => {
            let (start, end) = knesset.date_range(today);
            member_bill_stages_by_proposal_date(pool, member_id, start, end).await
        }
        BillStatsStrategy::StageDate => {
            member_bill_stages_by_stage_date(pool, member_id, knesset.effective_start()).await
        }
    }
}

pub async fn member_bill_counts(
    pool: &SqlitePool,
    member_id: i64,
    knesset: &Knesset,
    strategy: BillStatsStrategy,
    today: NaiveDate,
) -> Result<BillStageCounts> {
    let stages = member_bill_stages(pool, member_id, knesset, strategy, today).await?;
    Ok(BillStageCounts::from_stages(&stages))
}
