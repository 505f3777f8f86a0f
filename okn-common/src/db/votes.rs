//! Plenum votes, per-member vote actions and the filtered vote listing

use crate::{Error, Result};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Kind of plenum vote, stored as a slug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteType {
    LawApprove,
    SecondCall,
    Demurrer,
    NoConfidence,
    PassToCommittee,
    Continuation,
}

/// Title prefixes that identify each vote type, checked in order
const TITLE_PREFIXES: &[(&str, VoteType)] = &[
    ("אישור החוק", VoteType::LawApprove),
    ("הצבעה", VoteType::SecondCall),
    ("הסתייגות", VoteType::Demurrer),
    ("הצעת אי-אמון", VoteType::NoConfidence),
    ("הצעת אי אמון", VoteType::NoConfidence),
    ("להעביר את ", VoteType::PassToCommittee),
    ("להחיל דין רציפות", VoteType::Continuation),
];

impl VoteType {
    pub const ALL: [VoteType; 6] = [
        VoteType::LawApprove,
        VoteType::SecondCall,
        VoteType::Demurrer,
        VoteType::NoConfidence,
        VoteType::PassToCommittee,
        VoteType::Continuation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::LawApprove => "law-approve",
            VoteType::SecondCall => "second-call",
            VoteType::Demurrer => "demurrer",
            VoteType::NoConfidence => "no-confidence",
            VoteType::PassToCommittee => "pass-to-committee",
            VoteType::Continuation => "continuation",
        }
    }

    pub fn parse(slug: &str) -> Option<VoteType> {
        Self::ALL.into_iter().find(|t| t.as_str() == slug)
    }

    /// Classify a vote by the Hebrew prefix of its title
    pub fn classify_title(title: &str) -> Option<VoteType> {
        let title = title.trim_start();
        TITLE_PREFIXES
            .iter()
            .find(|(prefix, _)| title.starts_with(prefix))
            .map(|(_, vote_type)| *vote_type)
    }
}

/// How a member voted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteActionType {
    For,
    Against,
    Abstain,
    NoVote,
}

impl VoteActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteActionType::For => "for",
            VoteActionType::Against => "against",
            VoteActionType::Abstain => "abstain",
            VoteActionType::NoVote => "no-vote",
        }
    }

    pub fn parse(value: &str) -> Option<VoteActionType> {
        match value {
            "for" => Some(VoteActionType::For),
            "against" => Some(VoteActionType::Against),
            "abstain" => Some(VoteActionType::Abstain),
            "no-vote" => Some(VoteActionType::NoVote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vote {
    pub id: Option<i64>,
    pub title: String,
    pub vote_type: Option<VoteType>,
    pub time: NaiveDateTime,
    pub time_string: String,
    pub meeting_number: Option<i64>,
    pub vote_number: Option<i64>,
    pub src_url: Option<String>,
    pub summary: Option<String>,
    pub full_text: Option<String>,
    pub votes_count: Option<i64>,
    pub for_votes_count: Option<i64>,
    pub against_votes_count: Option<i64>,
    pub abstain_votes_count: Option<i64>,
    pub against_party: Option<i64>,
    pub against_coalition: Option<i64>,
    pub against_opposition: Option<i64>,
    pub against_own_bill: Option<i64>,
    pub controversy: Option<i64>,
    pub importance: f64,
}

impl Vote {
    pub fn new(title: &str, time: NaiveDateTime) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            vote_type: None,
            time,
            time_string: time.format("%d/%m/%Y %H:%M").to_string(),
            meeting_number: None,
            vote_number: None,
            src_url: None,
            summary: None,
            full_text: None,
            votes_count: None,
            for_votes_count: None,
            against_votes_count: None,
            abstain_votes_count: None,
            against_party: None,
            against_coalition: None,
            against_opposition: None,
            against_own_bill: None,
            controversy: None,
            importance: 0.0,
        }
    }

    /// More votes for than against
    pub fn passed(&self) -> bool {
        self.for_votes_count.unwrap_or(0) > self.against_votes_count.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteAction {
    pub vote_id: i64,
    pub member_id: i64,
    pub party_id: i64,
    #[serde(rename = "type")]
    pub action: VoteActionType,
    pub against_party: bool,
    pub against_coalition: bool,
    pub against_opposition: bool,
    pub against_own_bill: bool,
}

impl VoteAction {
    pub fn new(vote_id: i64, member_id: i64, party_id: i64, action: VoteActionType) -> Self {
        Self {
            vote_id,
            member_id,
            party_id,
            action,
            against_party: false,
            against_coalition: false,
            against_opposition: false,
            against_own_bill: false,
        }
    }
}

/// Time window of the vote listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeWindow {
    Week,
    Month,
    #[default]
    All,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [TimeWindow::Week, TimeWindow::Month, TimeWindow::All];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Week => "7",
            TimeWindow::Month => "30",
            TimeWindow::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<TimeWindow> {
        Self::ALL.into_iter().find(|w| w.as_str() == value)
    }

    pub fn days(self) -> Option<i64> {
        match self {
            TimeWindow::Week => Some(7),
            TimeWindow::Month => Some(30),
            TimeWindow::All => None,
        }
    }
}

/// Sort order of the vote listing, each descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VoteOrder {
    #[default]
    Time,
    Controversy,
    AgainstParty,
    Votes,
}

impl VoteOrder {
    pub const ALL: [VoteOrder; 4] = [
        VoteOrder::Time,
        VoteOrder::Controversy,
        VoteOrder::AgainstParty,
        VoteOrder::Votes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoteOrder::Time => "time",
            VoteOrder::Controversy => "controversy",
            VoteOrder::AgainstParty => "against-party",
            VoteOrder::Votes => "votes",
        }
    }

    pub fn parse(value: &str) -> Option<VoteOrder> {
        Self::ALL.into_iter().find(|o| o.as_str() == value)
    }

    fn order_by(self) -> &'static str {
        match self {
            VoteOrder::Time => "time DESC, id DESC",
            VoteOrder::Controversy => "controversy DESC, time DESC, id DESC",
            VoteOrder::AgainstParty => "against_party DESC, time DESC, id DESC",
            VoteOrder::Votes => "votes_count DESC, time DESC, id DESC",
        }
    }
}

/// Normalized vote listing filter; `vote_type: None` means every type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteFilter {
    pub vote_type: Option<VoteType>,
    pub time: TimeWindow,
    pub order: VoteOrder,
}

const VOTE_COLUMNS: &str = "id, title, vote_type, time, time_string, meeting_number, vote_number, \
    src_url, summary, full_text, votes_count, for_votes_count, against_votes_count, \
    abstain_votes_count, against_party, against_coalition, against_opposition, against_own_bill, \
    controversy, importance";

/// Vote columns qualified with a table alias
pub(crate) fn vote_columns(alias: &str) -> String {
    VOTE_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn vote_from_row(row: &sqlx::sqlite::SqliteRow) -> Vote {
    let vote_type: String = row.get("vote_type");
    Vote {
        id: row.get("id"),
        title: row.get("title"),
        vote_type: VoteType::parse(&vote_type),
        time: row.get("time"),
        time_string: row.get("time_string"),
        meeting_number: row.get("meeting_number"),
        vote_number: row.get("vote_number"),
        src_url: row.get("src_url"),
        summary: row.get("summary"),
        full_text: row.get("full_text"),
        votes_count: row.get("votes_count"),
        for_votes_count: row.get("for_votes_count"),
        against_votes_count: row.get("against_votes_count"),
        abstain_votes_count: row.get("abstain_votes_count"),
        against_party: row.get("against_party"),
        against_coalition: row.get("against_coalition"),
        against_opposition: row.get("against_opposition"),
        against_own_bill: row.get("against_own_bill"),
        controversy: row.get("controversy"),
        importance: row.get("importance"),
    }
}

/// Insert or update a vote, returning its id
///
/// A vote without an explicit type is classified from its title.
pub async fn save_vote(pool: &SqlitePool, vote: &Vote) -> Result<i64> {
    let vote_type = vote
        .vote_type
        .or_else(|| VoteType::classify_title(&vote.title))
        .map(VoteType::as_str)
        .unwrap_or("");

    let result = sqlx::query(
        r#"
        INSERT INTO votes (
            id, title, vote_type, time, time_string, meeting_number, vote_number, src_url,
            summary, full_text, votes_count, for_votes_count, against_votes_count,
            abstain_votes_count, against_party, against_coalition, against_opposition,
            against_own_bill, controversy, importance
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            vote_type = excluded.vote_type,
            time = excluded.time,
            time_string = excluded.time_string,
            meeting_number = excluded.meeting_number,
            vote_number = excluded.vote_number,
            src_url = excluded.src_url,
            summary = excluded.summary,
            full_text = excluded.full_text,
            votes_count = excluded.votes_count,
            for_votes_count = excluded.for_votes_count,
            against_votes_count = excluded.against_votes_count,
            abstain_votes_count = excluded.abstain_votes_count,
            against_party = excluded.against_party,
            against_coalition = excluded.against_coalition,
            against_opposition = excluded.against_opposition,
            against_own_bill = excluded.against_own_bill,
            controversy = excluded.controversy,
            importance = excluded.importance
        "#,
    )
    .bind(vote.id)
    .bind(&vote.title)
    .bind(vote_type)
    .bind(vote.time)
    .bind(&vote.time_string)
    .bind(vote.meeting_number)
    .bind(vote.vote_number)
    .bind(&vote.src_url)
    .bind(&vote.summary)
    .bind(&vote.full_text)
    .bind(vote.votes_count)
    .bind(vote.for_votes_count)
    .bind(vote.against_votes_count)
    .bind(vote.abstain_votes_count)
    .bind(vote.against_party)
    .bind(vote.against_coalition)
    .bind(vote.against_opposition)
    .bind(vote.against_own_bill)
    .bind(vote.controversy)
    .bind(vote.importance)
    .execute(pool)
    .await?;

    Ok(vote.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn load_vote(pool: &SqlitePool, id: i64) -> Result<Option<Vote>> {
    let row = sqlx::query(&format!("SELECT {} FROM votes WHERE id = ?", VOTE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(vote_from_row))
}

pub async fn get_vote(pool: &SqlitePool, id: i64) -> Result<Vote> {
    load_vote(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("vote {}", id)))
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &VoteFilter, now: NaiveDateTime) {
    builder.push(" WHERE 1 = 1");
    if let Some(vote_type) = filter.vote_type {
        builder.push(" AND vote_type = ").push_bind(vote_type.as_str());
    }
    if let Some(days) = filter.time.days() {
        builder.push(" AND time > ").push_bind(now - Duration::days(days));
    }
}

/// One page of votes matching the filter, in the filter's order
pub async fn filter_and_order(
    pool: &SqlitePool,
    filter: &VoteFilter,
    now: NaiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<Vote>> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM votes", VOTE_COLUMNS));
    push_filter(&mut builder, filter, now);
    builder.push(" ORDER BY ").push(filter.order.order_by());
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    Ok(rows.iter().map(vote_from_row).collect())
}

/// Number of votes matching the filter
pub async fn count_filtered(pool: &SqlitePool, filter: &VoteFilter, now: NaiveDateTime) -> Result<i64> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM votes");
    push_filter(&mut builder, filter, now);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Insert or replace a member's action on a vote
pub async fn save_vote_action(pool: &SqlitePool, action: &VoteAction) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vote_actions (vote_id, member_id, party_id, type, against_party,
            against_coalition, against_opposition, against_own_bill)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(vote_id, member_id) DO UPDATE SET
            party_id = excluded.party_id,
            type = excluded.type,
            against_party = excluded.against_party,
            against_coalition = excluded.against_coalition,
            against_opposition = excluded.against_opposition,
            against_own_bill = excluded.against_own_bill
        "#,
    )
    .bind(action.vote_id)
    .bind(action.member_id)
    .bind(action.party_id)
    .bind(action.action.as_str())
    .bind(action.against_party)
    .bind(action.against_coalition)
    .bind(action.against_opposition)
    .bind(action.against_own_bill)
    .execute(pool)
    .await?;

    Ok(())
}

fn action_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<VoteAction> {
    let kind: String = row.get("type");
    let action = VoteActionType::parse(&kind)
        .ok_or_else(|| Error::Internal(format!("unknown vote action type '{}'", kind)))?;

    Ok(VoteAction {
        vote_id: row.get("vote_id"),
        member_id: row.get("member_id"),
        party_id: row.get("party_id"),
        action,
        against_party: row.get("against_party"),
        against_coalition: row.get("against_coalition"),
        against_opposition: row.get("against_opposition"),
        against_own_bill: row.get("against_own_bill"),
    })
}

pub async fn actions_for_vote(pool: &SqlitePool, vote_id: i64) -> Result<Vec<VoteAction>> {
    let rows = sqlx::query(
        "SELECT vote_id, member_id, party_id, type, against_party, against_coalition, \
         against_opposition, against_own_bill FROM vote_actions WHERE vote_id = ? ORDER BY member_id",
    )
    .bind(vote_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(action_from_row).collect()
}

/// Votes where the member acted as given, newest first
pub async fn member_votes(
    pool: &SqlitePool,
    member_id: i64,
    action: VoteActionType,
) -> Result<Vec<Vote>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM votes v JOIN vote_actions va ON va.vote_id = v.id \
         WHERE va.member_id = ? AND va.type = ? ORDER BY v.time DESC, v.id DESC",
        vote_columns("v")
    ))
    .bind(member_id)
    .bind(action.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(vote_from_row).collect())
}

/// Recompute a vote's counts and alignment aggregates from its actions
///
/// Controversy is the smaller of the for and against counts.
pub async fn recount_vote(pool: &SqlitePool, vote_id: i64) -> Result<()> {
    let actions = actions_for_vote(pool, vote_id).await?;
    let count = |kind: VoteActionType| actions.iter().filter(|a| a.action == kind).count() as i64;
    let flagged = |f: fn(&VoteAction) -> bool| actions.iter().filter(|a| f(a)).count() as i64;

    let for_votes = count(VoteActionType::For);
    let against_votes = count(VoteActionType::Against);
    let abstain_votes = count(VoteActionType::Abstain);

    let result = sqlx::query(
        r#"
        UPDATE votes SET
            votes_count = ?,
            for_votes_count = ?,
            against_votes_count = ?,
            abstain_votes_count = ?,
            against_party = ?,
            against_coalition = ?,
            against_opposition = ?,
            against_own_bill = ?,
            controversy = ?
        WHERE id = ?
        "#,
    )
    .bind(for_votes + against_votes + abstain_votes)
    .bind(for_votes)
    .bind(against_votes)
    .bind(abstain_votes)
    .bind(flagged(|a| a.against_party))
    .bind(flagged(|a| a.against_coalition))
    .bind(flagged(|a| a.against_opposition))
    .bind(flagged(|a| a.against_own_bill))
    .bind(for_votes.min(against_votes))
    .bind(vote_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("vote {}", vote_id)));
    }
    Ok(())
}
