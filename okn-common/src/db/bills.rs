//! Bills, private proposals and bill stage tracking
//!
//! A bill's stage is derived from the evidence linked to it (votes, committee
//! meetings and proposals) by [`derive_stage`], a pure function. The
//! persistence side loads that evidence, runs the derivation and stores the
//! result with [`update_stage`].

use crate::db::knessets::first_knesset_start;
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Vote titles that mark a pre-vote as converting the bill into a discussion
pub const CONVERT_TO_DISCUSSION_HEADERS: [&str; 2] = ["להעביר את הנושא", "העברת הנושא"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillStage {
    Unknown,
    Frozen,
    Proposed,
    PreApproved,
    FailedPreApproval,
    ConvertedToDiscussion,
    InCommittee,
    FirstVote,
    FailedFirstVote,
    CommitteeCorrections,
    Approved,
    FailedApproval,
}

impl BillStage {
    pub const ALL: [BillStage; 12] = [
        BillStage::Unknown,
        BillStage::Frozen,
        BillStage::Proposed,
        BillStage::PreApproved,
        BillStage::FailedPreApproval,
        BillStage::ConvertedToDiscussion,
        BillStage::InCommittee,
        BillStage::FirstVote,
        BillStage::FailedFirstVote,
        BillStage::CommitteeCorrections,
        BillStage::Approved,
        BillStage::FailedApproval,
    ];

    /// Stage code as stored
    pub fn code(self) -> &'static str {
        match self {
            BillStage::Unknown => "?",
            BillStage::Frozen => "0",
            BillStage::Proposed => "1",
            BillStage::PreApproved => "2",
            BillStage::FailedPreApproval => "-2",
            BillStage::ConvertedToDiscussion => "-2.1",
            BillStage::InCommittee => "3",
            BillStage::FirstVote => "4",
            BillStage::FailedFirstVote => "-4",
            BillStage::CommitteeCorrections => "5",
            BillStage::Approved => "6",
            BillStage::FailedApproval => "-6",
        }
    }

    pub fn from_code(code: &str) -> Option<BillStage> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn description(self) -> &'static str {
        match self {
            BillStage::Unknown => "Unknown",
            BillStage::Frozen => "Frozen in previous knesset",
            BillStage::Proposed => "Proposed",
            BillStage::PreApproved => "Pre-Approved",
            BillStage::FailedPreApproval => "Failed Pre-Approval",
            BillStage::ConvertedToDiscussion => "Converted to discussion",
            BillStage::InCommittee => "In Committee",
            BillStage::FirstVote => "First Vote",
            BillStage::FailedFirstVote => "Failed First Vote",
            BillStage::CommitteeCorrections => "Committee Corrections",
            BillStage::Approved => "Approved",
            BillStage::FailedApproval => "Failed Approval",
        }
    }
}

/// Serialized as the stage code
impl Serialize for BillStage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Aggregate stage groups used by statistics and the bill listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageGroup {
    Proposed,
    Pre,
    First,
    Approved,
}

impl StageGroup {
    pub fn parse(name: &str) -> Option<StageGroup> {
        match name {
            "proposed" => Some(StageGroup::Proposed),
            "pre" => Some(StageGroup::Pre),
            "first" => Some(StageGroup::First),
            "approved" => Some(StageGroup::Approved),
            _ => None,
        }
    }

    /// Stages in the group; `Proposed` covers every stage
    pub fn stages(self) -> &'static [BillStage] {
        match self {
            StageGroup::Proposed => &BillStage::ALL,
            StageGroup::Pre => &[
                BillStage::PreApproved,
                BillStage::InCommittee,
                BillStage::FirstVote,
                BillStage::CommitteeCorrections,
                BillStage::Approved,
                BillStage::FailedFirstVote,
                BillStage::FailedApproval,
            ],
            StageGroup::First => &[
                BillStage::FirstVote,
                BillStage::CommitteeCorrections,
                BillStage::Approved,
                BillStage::FailedApproval,
            ],
            StageGroup::Approved => &[BillStage::Approved],
        }
    }

    pub fn contains(self, stage: BillStage) -> bool {
        self.stages().contains(&stage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bill {
    pub id: Option<i64>,
    pub title: String,
    pub popular_name: String,
    pub stage: BillStage,
    pub stage_date: Option<NaiveDate>,
    pub knesset_proposal_date: Option<NaiveDate>,
    pub gov_proposal_date: Option<NaiveDate>,
    pub first_vote_id: Option<i64>,
    pub approval_vote_id: Option<i64>,
    /// Booklet number the knesset proposal was published in
    pub knesset_booklet: Option<i64>,
    /// Booklet number the government proposal was published in
    pub gov_booklet: Option<i64>,
}

impl Bill {
    pub fn new(title: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            popular_name: String::new(),
            stage: BillStage::Unknown,
            stage_date: None,
            knesset_proposal_date: None,
            gov_proposal_date: None,
            first_vote_id: None,
            approval_vote_id: None,
            knesset_booklet: None,
            gov_booklet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrivateProposal {
    pub id: Option<i64>,
    /// Knesset's own proposal number
    pub proposal_id: Option<i64>,
    pub bill_id: Option<i64>,
    pub date: NaiveDate,
    pub title: String,
}

/// Outcome of a vote as seen by stage derivation
#[derive(Debug, Clone, PartialEq)]
pub struct VoteEvidence {
    pub date: NaiveDate,
    pub passed: bool,
    pub title: String,
}

/// Everything linked to a bill that moves its stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageEvidence {
    pub approval_vote: Option<VoteEvidence>,
    pub second_committee_meetings: Vec<NaiveDate>,
    pub first_vote: Option<VoteEvidence>,
    pub knesset_proposal_date: Option<NaiveDate>,
    pub gov_proposal_date: Option<NaiveDate>,
    pub first_committee_meetings: Vec<NaiveDate>,
    pub pre_votes: Vec<VoteEvidence>,
    pub private_proposals: Vec<NaiveDate>,
}

fn converts_to_discussion(title: &str) -> bool {
    CONVERT_TO_DISCUSSION_HEADERS
        .iter()
        .any(|header| title.contains(header))
}

/// Derive `(stage, stage_date)` from the bill's current state and evidence
///
/// Without `force` the current stage is trusted and only newer evidence moves
/// it. A bill with no stage date is derived from scratch.
pub fn derive_stage(
    current: BillStage,
    current_date: Option<NaiveDate>,
    evidence: &StageEvidence,
    force: bool,
) -> (BillStage, NaiveDate) {
    let mut stage = current;
    let mut stage_date = match current_date {
        Some(date) if !force => date,
        _ => first_knesset_start(),
    };

    if let Some(vote) = &evidence.approval_vote {
        let stage = if vote.passed {
            BillStage::Approved
        } else {
            BillStage::FailedApproval
        };
        return (stage, vote.date);
    }

    for &date in &evidence.second_committee_meetings {
        if stage_date < date {
            stage = BillStage::CommitteeCorrections;
            stage_date = date;
        }
    }
    if stage == BillStage::CommitteeCorrections {
        return (stage, stage_date);
    }

    if let Some(vote) = &evidence.first_vote {
        let stage = if vote.passed {
            BillStage::FirstVote
        } else {
            BillStage::FailedFirstVote
        };
        return (stage, vote.date);
    }

    for date in [evidence.knesset_proposal_date, evidence.gov_proposal_date]
        .into_iter()
        .flatten()
    {
        if stage_date < date {
            stage = BillStage::InCommittee;
            stage_date = date;
        }
    }

    // A committee meeting says little about a bill converted to discussion
    for &date in &evidence.first_committee_meetings {
        if stage_date < date && stage != BillStage::ConvertedToDiscussion {
            stage = BillStage::InCommittee;
            stage_date = date;
        }
    }

    for vote in &evidence.pre_votes {
        if stage_date < vote.date && converts_to_discussion(&vote.title) {
            stage = BillStage::ConvertedToDiscussion;
            stage_date = vote.date;
        }
    }

    for vote in &evidence.pre_votes {
        if stage_date < vote.date {
            stage = if vote.passed {
                BillStage::PreApproved
            } else {
                BillStage::FailedPreApproval
            };
            stage_date = vote.date;
        }
    }

    for &date in &evidence.private_proposals {
        if stage_date < date {
            stage = BillStage::Proposed;
            stage_date = date;
        }
    }

    (stage, stage_date)
}

/// Which proposal kind a bill must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillType {
    #[default]
    All,
    Government,
    Knesset,
    Private,
}

impl BillType {
    pub fn parse(value: &str) -> Option<BillType> {
        match value {
            "all" => Some(BillType::All),
            "government" => Some(BillType::Government),
            "knesset" => Some(BillType::Knesset),
            "private" => Some(BillType::Private),
            _ => None,
        }
    }
}

/// Stage filter of the bill listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFilter {
    Group(StageGroup),
    /// Stage codes starting with the given text
    Prefix(String),
}

impl StageFilter {
    /// `None` for `all` and empty input
    pub fn parse(value: &str) -> Option<StageFilter> {
        let value = value.trim();
        if value.is_empty() || value == "all" {
            return None;
        }
        Some(match StageGroup::parse(value) {
            Some(group) => StageFilter::Group(group),
            None => StageFilter::Prefix(value.to_string()),
        })
    }
}

/// How bills are attributed to a knesset term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodMatch {
    /// Private proposal date within the period
    ProposalDate,
    /// Stage date within the period
    StageDate,
}

/// A date period with the rule used to match bills against it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub matching: PeriodMatch,
}

/// Normalized bill listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillFilter {
    pub stage: Option<StageFilter>,
    pub member: Option<i64>,
    pub period: Option<BillPeriod>,
    pub bill_type: BillType,
    pub pp_id: Option<i64>,
    pub changed_after: Option<NaiveDate>,
    pub changed_before: Option<NaiveDate>,
    pub knesset_booklet: Option<i64>,
    pub gov_booklet: Option<i64>,
}

const BILL_COLUMNS: &str = "id, title, popular_name, stage, stage_date, knesset_proposal_date, \
    gov_proposal_date, first_vote_id, approval_vote_id, knesset_booklet, gov_booklet";

fn bill_from_row(row: &sqlx::sqlite::SqliteRow) -> Bill {
    let stage: String = row.get("stage");
    Bill {
        id: row.get("id"),
        title: row.get("title"),
        popular_name: row.get("popular_name"),
        stage: BillStage::from_code(&stage).unwrap_or(BillStage::Unknown),
        stage_date: row.get("stage_date"),
        knesset_proposal_date: row.get("knesset_proposal_date"),
        gov_proposal_date: row.get("gov_proposal_date"),
        first_vote_id: row.get("first_vote_id"),
        approval_vote_id: row.get("approval_vote_id"),
        knesset_booklet: row.get("knesset_booklet"),
        gov_booklet: row.get("gov_booklet"),
    }
}

pub async fn save_bill(pool: &SqlitePool, bill: &Bill) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO bills (id, title, popular_name, stage, stage_date, knesset_proposal_date,
            gov_proposal_date, first_vote_id, approval_vote_id, knesset_booklet, gov_booklet)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            popular_name = excluded.popular_name,
            stage = excluded.stage,
            stage_date = excluded.stage_date,
            knesset_proposal_date = excluded.knesset_proposal_date,
            gov_proposal_date = excluded.gov_proposal_date,
            first_vote_id = excluded.first_vote_id,
            approval_vote_id = excluded.approval_vote_id,
            knesset_booklet = excluded.knesset_booklet,
            gov_booklet = excluded.gov_booklet
        "#,
    )
    .bind(bill.id)
    .bind(&bill.title)
    .bind(&bill.popular_name)
    .bind(bill.stage.code())
    .bind(bill.stage_date)
    .bind(bill.knesset_proposal_date)
    .bind(bill.gov_proposal_date)
    .bind(bill.first_vote_id)
    .bind(bill.approval_vote_id)
    .bind(bill.knesset_booklet)
    .bind(bill.gov_booklet)
    .execute(pool)
    .await?;

    Ok(bill.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn load_bill(pool: &SqlitePool, id: i64) -> Result<Option<Bill>> {
    let row = sqlx::query(&format!("SELECT {} FROM bills WHERE id = ?", BILL_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(bill_from_row))
}

pub async fn add_proposer(pool: &SqlitePool, bill_id: i64, member_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO bill_proposers (bill_id, member_id) VALUES (?, ?)")
        .bind(bill_id)
        .bind(member_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn proposer_ids(pool: &SqlitePool, bill_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT member_id FROM bill_proposers WHERE bill_id = ? ORDER BY member_id")
            .bind(bill_id)
            .fetch_all(pool)
            .await?;

    Ok(ids)
}

/// Record a member who joined the bill after it was proposed
pub async fn add_joiner(pool: &SqlitePool, bill_id: i64, member_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO bill_joiners (bill_id, member_id) VALUES (?, ?)")
        .bind(bill_id)
        .bind(member_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn joiner_ids(pool: &SqlitePool, bill_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT member_id FROM bill_joiners WHERE bill_id = ? ORDER BY member_id")
            .bind(bill_id)
            .fetch_all(pool)
            .await?;

    Ok(ids)
}

pub async fn add_pre_vote(pool: &SqlitePool, bill_id: i64, vote_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO bill_pre_votes (bill_id, vote_id) VALUES (?, ?)")
        .bind(bill_id)
        .bind(vote_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Link a committee meeting discussing the bill before (`1`) or after (`2`) the first vote
pub async fn add_committee_meeting(
    pool: &SqlitePool,
    bill_id: i64,
    meeting_id: i64,
    reading: i64,
) -> Result<()> {
    if reading != 1 && reading != 2 {
        return Err(Error::InvalidInput(format!("invalid reading {}", reading)));
    }

    sqlx::query(
        "INSERT OR IGNORE INTO bill_committee_meetings (bill_id, meeting_id, reading) VALUES (?, ?, ?)",
    )
    .bind(bill_id)
    .bind(meeting_id)
    .bind(reading)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a private proposal; its proposers also become proposers of the bill
pub async fn save_private_proposal(
    pool: &SqlitePool,
    proposal: &PrivateProposal,
    proposers: &[i64],
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO private_proposals (proposal_id, bill_id, date, title) VALUES (?, ?, ?, ?)",
    )
    .bind(proposal.proposal_id)
    .bind(proposal.bill_id)
    .bind(proposal.date)
    .bind(&proposal.title)
    .execute(pool)
    .await?;
    let id = result.last_insert_rowid();

    for &member_id in proposers {
        sqlx::query("INSERT OR IGNORE INTO private_proposal_proposers (proposal_id, member_id) VALUES (?, ?)")
            .bind(id)
            .bind(member_id)
            .execute(pool)
            .await?;
        if let Some(bill_id) = proposal.bill_id {
            add_proposer(pool, bill_id, member_id).await?;
        }
    }

    Ok(id)
}

async fn vote_evidence(pool: &SqlitePool, vote_id: Option<i64>) -> Result<Option<VoteEvidence>> {
    let Some(vote_id) = vote_id else {
        return Ok(None);
    };

    let row: Option<(String, NaiveDateTime, Option<i64>, Option<i64>)> = sqlx::query_as(
        "SELECT title, time, for_votes_count, against_votes_count FROM votes WHERE id = ?",
    )
    .bind(vote_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(title, time, for_votes, against_votes)| VoteEvidence {
        date: time.date(),
        passed: for_votes.unwrap_or(0) > against_votes.unwrap_or(0),
        title,
    }))
}

/// Load every piece of evidence linked to a bill
pub async fn load_stage_evidence(pool: &SqlitePool, bill: &Bill) -> Result<StageEvidence> {
    let Some(bill_id) = bill.id else {
        return Ok(StageEvidence::default());
    };

    let meetings: Vec<(i64, NaiveDate)> = sqlx::query_as(
        "SELECT bcm.reading, cm.date FROM bill_committee_meetings bcm \
         JOIN committee_meetings cm ON cm.id = bcm.meeting_id \
         WHERE bcm.bill_id = ? ORDER BY cm.date",
    )
    .bind(bill_id)
    .fetch_all(pool)
    .await?;

    let pre_votes: Vec<(String, NaiveDateTime, Option<i64>, Option<i64>)> = sqlx::query_as(
        "SELECT v.title, v.time, v.for_votes_count, v.against_votes_count FROM bill_pre_votes bpv \
         JOIN votes v ON v.id = bpv.vote_id WHERE bpv.bill_id = ? ORDER BY v.time",
    )
    .bind(bill_id)
    .fetch_all(pool)
    .await?;

    let private_proposals: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT date FROM private_proposals WHERE bill_id = ? ORDER BY date")
            .bind(bill_id)
            .fetch_all(pool)
            .await?;

    Ok(StageEvidence {
        approval_vote: vote_evidence(pool, bill.approval_vote_id).await?,
        second_committee_meetings: meetings
            .iter()
            .filter(|(reading, _)| *reading == 2)
            .map(|(_, date)| *date)
            .collect(),
        first_vote: vote_evidence(pool, bill.first_vote_id).await?,
        knesset_proposal_date: bill.knesset_proposal_date,
        gov_proposal_date: bill.gov_proposal_date,
        first_committee_meetings: meetings
            .iter()
            .filter(|(reading, _)| *reading == 1)
            .map(|(_, date)| *date)
            .collect(),
        pre_votes: pre_votes
            .into_iter()
            .map(|(title, time, for_votes, against_votes)| VoteEvidence {
                date: time.date(),
                passed: for_votes.unwrap_or(0) > against_votes.unwrap_or(0),
                title,
            })
            .collect(),
        private_proposals,
    })
}

/// Recompute and store a bill's stage, returning the updated bill
pub async fn update_stage(pool: &SqlitePool, bill_id: i64, force: bool) -> Result<Bill> {
    let mut bill = load_bill(pool, bill_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("bill {}", bill_id)))?;

    let evidence = load_stage_evidence(pool, &bill).await?;
    let (stage, stage_date) = derive_stage(bill.stage, bill.stage_date, &evidence, force);

    sqlx::query("UPDATE bills SET stage = ?, stage_date = ? WHERE id = ?")
        .bind(stage.code())
        .bind(stage_date)
        .bind(bill_id)
        .execute(pool)
        .await?;

    bill.stage = stage;
    bill.stage_date = Some(stage_date);
    Ok(bill)
}

fn push_stages(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, stages: &[BillStage]) {
    builder.push(format!(" AND {} IN (", column));
    let mut separated = builder.separated(", ");
    for stage in stages {
        separated.push_bind(stage.code());
    }
    separated.push_unseparated(")");
}

fn push_bill_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &BillFilter) {
    builder.push(" WHERE 1 = 1");

    match &filter.stage {
        Some(StageFilter::Group(group)) => push_stages(builder, "b.stage", group.stages()),
        Some(StageFilter::Prefix(prefix)) => {
            // Literal comparison, LIKE would treat `_` and `%` as wildcards
            builder
                .push(" AND substr(b.stage, 1, length(")
                .push_bind(prefix.clone())
                .push(")) = ")
                .push_bind(prefix.clone());
        }
        None => {}
    }

    if let Some(member) = filter.member {
        builder
            .push(" AND b.id IN (SELECT bill_id FROM bill_proposers WHERE member_id = ")
            .push_bind(member)
            .push(")");
    }

    if let Some(period) = filter.period {
        match (period.matching, filter.member) {
            (PeriodMatch::ProposalDate, Some(member)) => {
                builder
                    .push(
                        " AND b.id IN (SELECT pp.bill_id FROM private_proposals pp \
                         JOIN private_proposal_proposers ppp ON ppp.proposal_id = pp.id \
                         WHERE ppp.member_id = ",
                    )
                    .push_bind(member)
                    .push(" AND pp.date BETWEEN ")
                    .push_bind(period.start)
                    .push(" AND ")
                    .push_bind(period.end)
                    .push(")");
            }
            _ => {
                builder
                    .push(" AND b.stage_date BETWEEN ")
                    .push_bind(period.start)
                    .push(" AND ")
                    .push_bind(period.end);
            }
        }
    }

    match filter.bill_type {
        BillType::All => {}
        BillType::Government => {
            builder.push(" AND b.gov_proposal_date IS NOT NULL");
        }
        BillType::Knesset => {
            builder.push(" AND b.knesset_proposal_date IS NOT NULL");
        }
        BillType::Private => {
            builder.push(" AND EXISTS (SELECT 1 FROM private_proposals pp WHERE pp.bill_id = b.id)");
        }
    }

    if let Some(pp_id) = filter.pp_id {
        builder
            .push(" AND b.id IN (SELECT bill_id FROM private_proposals WHERE proposal_id = ")
            .push_bind(pp_id)
            .push(")");
    }

    if let Some(after) = filter.changed_after {
        builder.push(" AND b.stage_date >= ").push_bind(after);
    }
    if let Some(before) = filter.changed_before {
        builder.push(" AND b.stage_date <= ").push_bind(before);
    }

    if let Some(booklet) = filter.knesset_booklet {
        builder.push(" AND b.knesset_booklet = ").push_bind(booklet);
    }
    if let Some(booklet) = filter.gov_booklet {
        builder.push(" AND b.gov_booklet = ").push_bind(booklet);
    }
}

/// One page of bills matching the filter, newest stage change first
pub async fn filter_and_order(
    pool: &SqlitePool,
    filter: &BillFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Bill>> {
    let columns = BILL_COLUMNS
        .split(", ")
        .map(|c| format!("b.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder = QueryBuilder::new(format!("SELECT {} FROM bills b", columns));
    push_bill_filter(&mut builder, filter);
    builder.push(" ORDER BY b.stage_date DESC, b.id DESC LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    Ok(rows.iter().map(bill_from_row).collect())
}

pub async fn count_filtered(pool: &SqlitePool, filter: &BillFilter) -> Result<i64> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM bills b");
    push_bill_filter(&mut builder, filter);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

fn parse_stages(codes: Vec<String>) -> Vec<BillStage> {
    codes
        .iter()
        .map(|code| BillStage::from_code(code).unwrap_or(BillStage::Unknown))
        .collect()
}

/// Stages of the member's bills with a private proposal by the member dated in `[start, end]`
pub async fn member_bill_stages_by_proposal_date(
    pool: &SqlitePool,
    member_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<BillStage>> {
    let codes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT b.stage FROM bills b
        WHERE b.id IN (SELECT bill_id FROM bill_proposers WHERE member_id = ?1)
          AND b.id IN (
            SELECT pp.bill_id FROM private_proposals pp
            JOIN private_proposal_proposers ppp ON ppp.proposal_id = pp.id
            WHERE ppp.member_id = ?1 AND pp.date BETWEEN ?2 AND ?3
          )
        "#,
    )
    .bind(member_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(parse_stages(codes))
}

/// Stages of the member's bills whose stage date is on or after `since`
pub async fn member_bill_stages_by_stage_date(
    pool: &SqlitePool,
    member_id: i64,
    since: NaiveDate,
) -> Result<Vec<BillStage>> {
    let codes: Vec<String> = sqlx::query_scalar(
        "SELECT b.stage FROM bills b JOIN bill_proposers bp ON bp.bill_id = b.id \
         WHERE bp.member_id = ? AND b.stage_date >= ?",
    )
    .bind(member_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(parse_stages(codes))
}
