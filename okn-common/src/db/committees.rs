//! Committees, their meetings and meeting protocols

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

pub const DEFAULT_COMMITTEE_TYPE: &str = "committee";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Committee {
    pub id: Option<i64>,
    pub name: String,
    pub name_eng: Option<String>,
    pub name_arb: Option<String>,
    pub description: Option<String>,
    pub hide: bool,
    #[serde(rename = "type")]
    pub committee_type: String,
    pub knesset_id: Option<i64>,
}

impl Committee {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            name_eng: None,
            name_arb: None,
            description: None,
            hide: false,
            committee_type: DEFAULT_COMMITTEE_TYPE.to_string(),
            knesset_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitteeMeeting {
    pub id: Option<i64>,
    pub committee_id: i64,
    pub date: NaiveDate,
    pub datetime: Option<NaiveDateTime>,
    pub date_string: String,
    pub topics: Option<String>,
    pub protocol_text: Option<String>,
    pub src_url: Option<String>,
}

impl CommitteeMeeting {
    pub fn new(committee_id: i64, date: NaiveDate) -> Self {
        Self {
            id: None,
            committee_id,
            date,
            datetime: None,
            date_string: date.format("%d/%m/%Y").to_string(),
            topics: None,
            protocol_text: None,
            src_url: None,
        }
    }
}

/// Someone present at a meeting, not necessarily a member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingAttendee {
    pub id: Option<i64>,
    pub meeting_id: i64,
    pub name: String,
    pub role: String,
    pub additional_information: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolPart {
    pub id: Option<i64>,
    pub meeting_id: i64,
    pub order: i64,
    pub header: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub part_type: Option<String>,
    pub speaker_id: Option<i64>,
}

/// Member link tables of a committee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitteeRole {
    Member,
    Chairperson,
    Replacement,
}

impl CommitteeRole {
    fn table(self) -> &'static str {
        match self {
            CommitteeRole::Member => "committee_members",
            CommitteeRole::Chairperson => "committee_chairpersons",
            CommitteeRole::Replacement => "committee_replacements",
        }
    }
}

const COMMITTEE_COLUMNS: &str = "id, name, name_eng, name_arb, description, hide, type, knesset_id";

const MEETING_COLUMNS: &str =
    "id, committee_id, date, datetime, date_string, topics, protocol_text, src_url";

fn committee_from_row(row: &sqlx::sqlite::SqliteRow) -> Committee {
    Committee {
        id: row.get("id"),
        name: row.get("name"),
        name_eng: row.get("name_eng"),
        name_arb: row.get("name_arb"),
        description: row.get("description"),
        hide: row.get("hide"),
        committee_type: row.get("type"),
        knesset_id: row.get("knesset_id"),
    }
}

fn meeting_from_row(row: &sqlx::sqlite::SqliteRow) -> CommitteeMeeting {
    CommitteeMeeting {
        id: row.get("id"),
        committee_id: row.get("committee_id"),
        date: row.get("date"),
        datetime: row.get("datetime"),
        date_string: row.get("date_string"),
        topics: row.get("topics"),
        protocol_text: row.get("protocol_text"),
        src_url: row.get("src_url"),
    }
}

pub async fn save_committee(pool: &SqlitePool, committee: &Committee) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO committees (id, name, name_eng, name_arb, description, hide, type, knesset_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            name_eng = excluded.name_eng,
            name_arb = excluded.name_arb,
            description = excluded.description,
            hide = excluded.hide,
            type = excluded.type,
            knesset_id = excluded.knesset_id
        "#,
    )
    .bind(committee.id)
    .bind(&committee.name)
    .bind(&committee.name_eng)
    .bind(&committee.name_arb)
    .bind(&committee.description)
    .bind(committee.hide)
    .bind(&committee.committee_type)
    .bind(committee.knesset_id)
    .execute(pool)
    .await?;

    Ok(committee.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn load_committee(pool: &SqlitePool, id: i64) -> Result<Option<Committee>> {
    let row = sqlx::query(&format!("SELECT {} FROM committees WHERE id = ?", COMMITTEE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(committee_from_row))
}

/// Visible committees ordered by name
pub async fn list_committees(pool: &SqlitePool) -> Result<Vec<Committee>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM committees WHERE hide = 0 ORDER BY name",
        COMMITTEE_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(committee_from_row).collect())
}

pub async fn add_committee_member(
    pool: &SqlitePool,
    committee_id: i64,
    member_id: i64,
    role: CommitteeRole,
) -> Result<()> {
    sqlx::query(&format!(
        "INSERT OR IGNORE INTO {} (committee_id, member_id) VALUES (?, ?)",
        role.table()
    ))
    .bind(committee_id)
    .bind(member_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn committee_member_ids(
    pool: &SqlitePool,
    committee_id: i64,
    role: CommitteeRole,
) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(&format!(
        "SELECT member_id FROM {} WHERE committee_id = ? ORDER BY member_id",
        role.table()
    ))
    .bind(committee_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

pub async fn save_meeting(pool: &SqlitePool, meeting: &CommitteeMeeting) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO committee_meetings
            (id, committee_id, date, datetime, date_string, topics, protocol_text, src_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            committee_id = excluded.committee_id,
            date = excluded.date,
            datetime = excluded.datetime,
            date_string = excluded.date_string,
            topics = excluded.topics,
            protocol_text = excluded.protocol_text,
            src_url = excluded.src_url
        "#,
    )
    .bind(meeting.id)
    .bind(meeting.committee_id)
    .bind(meeting.date)
    .bind(meeting.datetime)
    .bind(&meeting.date_string)
    .bind(&meeting.topics)
    .bind(&meeting.protocol_text)
    .bind(&meeting.src_url)
    .execute(pool)
    .await?;

    Ok(meeting.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn load_meeting(pool: &SqlitePool, id: i64) -> Result<Option<CommitteeMeeting>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM committee_meetings WHERE id = ?",
        MEETING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(meeting_from_row))
}

/// Meetings of a committee, newest first
pub async fn meetings_of_committee(
    pool: &SqlitePool,
    committee_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<CommitteeMeeting>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM committee_meetings WHERE committee_id = ? \
         ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
        MEETING_COLUMNS
    ))
    .bind(committee_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(meeting_from_row).collect())
}

pub async fn count_meetings_of_committee(pool: &SqlitePool, committee_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM committee_meetings WHERE committee_id = ?")
        .bind(committee_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Record that a member attended a meeting
pub async fn add_attending_member(pool: &SqlitePool, meeting_id: i64, member_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO committee_meeting_members (meeting_id, member_id) VALUES (?, ?)")
        .bind(meeting_id)
        .bind(member_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn attending_member_ids(pool: &SqlitePool, meeting_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT member_id FROM committee_meeting_members WHERE meeting_id = ? ORDER BY member_id",
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Meetings a member attended on or after `since`
pub async fn count_meetings_attended(pool: &SqlitePool, member_id: i64, since: NaiveDate) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM committee_meeting_members cmm
        JOIN committee_meetings cm ON cm.id = cmm.meeting_id
        WHERE cmm.member_id = ? AND cm.date >= ?
        "#,
    )
    .bind(member_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Committee participation of a member since a date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitteeParticipation {
    pub committee_id: i64,
    pub name: String,
    pub meetings: i64,
}

/// Per-committee meeting counts for a member, busiest committee first
pub async fn committee_participation(
    pool: &SqlitePool,
    member_id: i64,
    since: NaiveDate,
) -> Result<Vec<CommitteeParticipation>> {
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(
        r#"
        SELECT c.id, c.name, COUNT(*) AS meetings
        FROM committee_meeting_members cmm
        JOIN committee_meetings cm ON cm.id = cmm.meeting_id
        JOIN committees c ON c.id = cm.committee_id
        WHERE cmm.member_id = ? AND cm.date >= ?
        GROUP BY c.id, c.name
        ORDER BY meetings DESC, c.name
        "#,
    )
    .bind(member_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(committee_id, name, meetings)| CommitteeParticipation {
            committee_id,
            name,
            meetings,
        })
        .collect())
}

pub async fn add_attendee(pool: &SqlitePool, attendee: &MeetingAttendee) -> Result<i64> {
    if attendee.name.trim().is_empty() {
        return Err(Error::InvalidInput("attendee name is empty".to_string()));
    }

    let result = sqlx::query(
        "INSERT INTO committee_meeting_attendees (meeting_id, name, role, additional_information) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(attendee.meeting_id)
    .bind(&attendee.name)
    .bind(&attendee.role)
    .bind(&attendee.additional_information)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn attendees_of_meeting(pool: &SqlitePool, meeting_id: i64) -> Result<Vec<MeetingAttendee>> {
    let rows: Vec<(i64, i64, String, String, Option<String>)> = sqlx::query_as(
        "SELECT id, meeting_id, name, role, additional_information \
         FROM committee_meeting_attendees WHERE meeting_id = ? ORDER BY id",
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, meeting_id, name, role, additional_information)| MeetingAttendee {
            id: Some(id),
            meeting_id,
            name,
            role,
            additional_information,
        })
        .collect())
}

pub async fn add_protocol_part(pool: &SqlitePool, part: &ProtocolPart) -> Result<i64> {
    let result = sqlx::query(
        r#"INSERT INTO protocol_parts (meeting_id, "order", header, body, type, speaker_id)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(part.meeting_id)
    .bind(part.order)
    .bind(&part.header)
    .bind(&part.body)
    .bind(&part.part_type)
    .bind(part.speaker_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Protocol of a meeting in reading order
pub async fn protocol_parts(pool: &SqlitePool, meeting_id: i64) -> Result<Vec<ProtocolPart>> {
    let rows = sqlx::query(
        r#"SELECT id, meeting_id, "order", header, body, type, speaker_id
           FROM protocol_parts WHERE meeting_id = ? ORDER BY "order", id"#,
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ProtocolPart {
            id: row.get("id"),
            meeting_id: row.get("meeting_id"),
            order: row.get("order"),
            header: row.get("header"),
            body: row.get("body"),
            part_type: row.get("type"),
            speaker_id: row.get("speaker_id"),
        })
        .collect())
}

pub async fn add_mentioned_lobbyist(pool: &SqlitePool, meeting_id: i64, lobbyist_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO committee_meeting_lobbyists (meeting_id, lobbyist_id) VALUES (?, ?)")
        .bind(meeting_id)
        .bind(lobbyist_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn add_mentioned_corporation(
    pool: &SqlitePool,
    meeting_id: i64,
    corporation_id: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO committee_meeting_corporations (meeting_id, corporation_id) VALUES (?, ?)",
    )
    .bind(meeting_id)
    .bind(corporation_id)
    .execute(pool)
    .await?;

    Ok(())
}
