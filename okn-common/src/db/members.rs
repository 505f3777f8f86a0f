//! Knesset member records, party memberships and alternate names
//!
//! Member ids are the official Knesset member ids. When an id is not known
//! at insert time the next free id (`max + 1`) is allocated.

use crate::db::parties::Party;
use crate::time::within;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Default position for members without an explicit list position
pub const DEFAULT_POSITION: i64 = 999;

/// A member of the Knesset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub id: Option<i64>,
    pub name: String,
    pub current_party_id: Option<i64>,
    pub current_position: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub img_url: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    pub is_current: bool,
    /// `M` or `F`
    pub gender: Option<String>,
    /// Pipe separated role list, overrides the generated description
    pub current_role_descriptions: Option<String>,
    pub backlinks_enabled: bool,
    #[serde(flatten)]
    pub stats: CachedStats,
}

/// Statistics persisted on the member row by the refresh job
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CachedStats {
    pub bills_stats_proposed: i64,
    pub bills_stats_pre: i64,
    pub bills_stats_first: i64,
    pub bills_stats_approved: i64,
    pub average_weekly_presence_hours: Option<f64>,
    pub average_monthly_committee_presence: Option<f64>,
}

impl Member {
    pub fn new(id: Option<i64>, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            current_party_id: None,
            current_position: DEFAULT_POSITION,
            start_date: None,
            end_date: None,
            img_url: String::new(),
            phone: None,
            email: None,
            website: None,
            date_of_birth: None,
            place_of_birth: None,
            is_current: true,
            gender: None,
            current_role_descriptions: None,
            backlinks_enabled: true,
            stats: CachedStats::default(),
        }
    }

    pub fn is_female(&self) -> bool {
        self.gender.as_deref() == Some("F")
    }

    pub fn firstname(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }

    /// URL slug form of the name
    pub fn name_with_dashes(&self) -> String {
        self.name
            .replace(" - ", " ")
            .replace(['\'', '”', '`', '(', ')'], "")
            .replace('\u{a0}', " ")
            .replace(' ', "-")
    }

    /// Higher resolution variant of the member image
    pub fn highres_img_url(&self) -> String {
        self.img_url.replace("-s.jpg", ".jpg")
    }

    /// Explicit role descriptions, or a description derived from status
    pub fn role(&self, current_party: Option<&Party>) -> String {
        if let Some(roles) = &self.current_role_descriptions {
            if !roles.trim().is_empty() {
                return roles.clone();
            }
        }

        let gender = if self.is_female() { "female" } else { "male" };
        if self.is_current {
            let side = match current_party {
                Some(party) if party.is_coalition => "Coalition",
                _ => "Opposition",
            };
            format!("{} Member ({})", side, gender)
        } else {
            format!("Past Member ({})", gender)
        }
    }

    /// Role list split on `|`
    pub fn roles(&self, current_party: Option<&Party>) -> Vec<String> {
        self.role(current_party)
            .split('|')
            .map(|r| r.trim().to_string())
            .collect()
    }

    pub fn is_minister(&self, current_party: Option<&Party>) -> bool {
        self.roles(current_party)
            .iter()
            .any(|r| r.starts_with("Minister"))
    }

    /// `Some(true)` coalition, `Some(false)` opposition, `None` past member
    pub fn coalition_status(&self, current_party: Option<&Party>) -> Option<bool> {
        if !self.is_current {
            return None;
        }
        Some(current_party.map(|p| p.is_coalition).unwrap_or(false))
    }
}

/// A time-bounded link between a member and a party
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Membership {
    pub member_id: i64,
    pub party_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub position: i64,
}

/// Party the member belonged to on `date`
///
/// When memberships overlap, the one that started last wins.
pub fn party_at(memberships: &[Membership], date: NaiveDate) -> Option<i64> {
    memberships
        .iter()
        .filter(|m| within(date, m.start_date, m.end_date))
        .max_by_key(|m| m.start_date)
        .map(|m| m.party_id)
}

const MEMBER_COLUMNS: &str = "id, name, current_party_id, current_position, start_date, end_date, \
    img_url, phone, email, website, date_of_birth, place_of_birth, is_current, gender, \
    current_role_descriptions, backlinks_enabled, bills_stats_proposed, bills_stats_pre, \
    bills_stats_first, bills_stats_approved, average_weekly_presence_hours, \
    average_monthly_committee_presence";

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        name: row.get("name"),
        current_party_id: row.get("current_party_id"),
        current_position: row.get("current_position"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        img_url: row.get("img_url"),
        phone: row.get("phone"),
        email: row.get("email"),
        website: row.get("website"),
        date_of_birth: row.get("date_of_birth"),
        place_of_birth: row.get("place_of_birth"),
        is_current: row.get("is_current"),
        gender: row.get("gender"),
        current_role_descriptions: row.get("current_role_descriptions"),
        backlinks_enabled: row.get("backlinks_enabled"),
        stats: CachedStats {
            bills_stats_proposed: row.get("bills_stats_proposed"),
            bills_stats_pre: row.get("bills_stats_pre"),
            bills_stats_first: row.get("bills_stats_first"),
            bills_stats_approved: row.get("bills_stats_approved"),
            average_weekly_presence_hours: row.get("average_weekly_presence_hours"),
            average_monthly_committee_presence: row.get("average_monthly_committee_presence"),
        },
    }
}

/// Next free member id
async fn allocate_member_id(pool: &SqlitePool) -> Result<i64> {
    let max_id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM members")
        .fetch_one(pool)
        .await?;

    Ok(max_id.unwrap_or(0) + 1)
}

/// Insert or update a member, returning its id
///
/// Cached statistics are not written here; see [`update_cached_stats`].
pub async fn save_member(pool: &SqlitePool, member: &Member) -> Result<i64> {
    let id = match member.id {
        Some(id) => id,
        None => allocate_member_id(pool).await?,
    };

    sqlx::query(
        r#"
        INSERT INTO members (
            id, name, current_party_id, current_position, start_date, end_date, img_url,
            phone, email, website, date_of_birth, place_of_birth, is_current, gender,
            current_role_descriptions, backlinks_enabled
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            current_party_id = excluded.current_party_id,
            current_position = excluded.current_position,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            img_url = excluded.img_url,
            phone = excluded.phone,
            email = excluded.email,
            website = excluded.website,
            date_of_birth = excluded.date_of_birth,
            place_of_birth = excluded.place_of_birth,
            is_current = excluded.is_current,
            gender = excluded.gender,
            current_role_descriptions = excluded.current_role_descriptions,
            backlinks_enabled = excluded.backlinks_enabled
        "#,
    )
    .bind(id)
    .bind(&member.name)
    .bind(member.current_party_id)
    .bind(member.current_position)
    .bind(member.start_date)
    .bind(member.end_date)
    .bind(&member.img_url)
    .bind(&member.phone)
    .bind(&member.email)
    .bind(&member.website)
    .bind(member.date_of_birth)
    .bind(&member.place_of_birth)
    .bind(member.is_current)
    .bind(&member.gender)
    .bind(&member.current_role_descriptions)
    .bind(member.backlinks_enabled)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn load_member(pool: &SqlitePool, id: i64) -> Result<Option<Member>> {
    let row = sqlx::query(&format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(member_from_row))
}

/// Load a member or fail with [`Error::NotFound`]
pub async fn get_member(pool: &SqlitePool, id: i64) -> Result<Member> {
    load_member(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("member {}", id)))
}

/// Every member, ordered by name
pub async fn list_members(pool: &SqlitePool) -> Result<Vec<Member>> {
    let rows = sqlx::query(&format!("SELECT {} FROM members ORDER BY name", MEMBER_COLUMNS))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(member_from_row).collect())
}

/// Members currently serving, ordered by name
pub async fn list_current_members(pool: &SqlitePool) -> Result<Vec<Member>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM members WHERE is_current = 1 ORDER BY name",
        MEMBER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(member_from_row).collect())
}

/// Members of a party for display
///
/// For a party of the current knesset these are the serving members whose
/// current party it is; for older parties every member ever linked to it.
pub async fn party_current_members(
    pool: &SqlitePool,
    party: &Party,
    current_knesset: Option<i64>,
) -> Result<Vec<Member>> {
    let Some(party_id) = party.id else {
        return Ok(Vec::new());
    };

    let sql = if party.is_current(current_knesset) {
        format!(
            "SELECT {} FROM members WHERE current_party_id = ? AND is_current = 1 \
             ORDER BY current_position, name",
            MEMBER_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM members WHERE id IN \
             (SELECT member_id FROM memberships WHERE party_id = ?) \
             ORDER BY current_position, name",
            MEMBER_COLUMNS
        )
    };

    let rows = sqlx::query(&sql).bind(party_id).fetch_all(pool).await?;
    Ok(rows.iter().map(member_from_row).collect())
}

/// Members whose current party is this one but who no longer serve
pub async fn party_past_members(pool: &SqlitePool, party_id: i64) -> Result<Vec<Member>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM members WHERE current_party_id = ? AND is_current = 0 ORDER BY name",
        MEMBER_COLUMNS
    ))
    .bind(party_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(member_from_row).collect())
}

/// Persist recomputed statistics onto the member row
pub async fn update_cached_stats(pool: &SqlitePool, member_id: i64, stats: &CachedStats) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE members SET
            bills_stats_proposed = ?,
            bills_stats_pre = ?,
            bills_stats_first = ?,
            bills_stats_approved = ?,
            average_weekly_presence_hours = ?,
            average_monthly_committee_presence = ?
        WHERE id = ?
        "#,
    )
    .bind(stats.bills_stats_proposed)
    .bind(stats.bills_stats_pre)
    .bind(stats.bills_stats_first)
    .bind(stats.bills_stats_approved)
    .bind(stats.average_weekly_presence_hours)
    .bind(stats.average_monthly_committee_presence)
    .bind(member_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("member {}", member_id)));
    }
    Ok(())
}

/// Persist only the weekly presence average
pub async fn set_average_weekly_presence(
    pool: &SqlitePool,
    member_id: i64,
    hours: Option<f64>,
) -> Result<()> {
    sqlx::query("UPDATE members SET average_weekly_presence_hours = ? WHERE id = ?")
        .bind(hours)
        .bind(member_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn add_membership(pool: &SqlitePool, membership: &Membership) -> Result<()> {
    sqlx::query(
        "INSERT INTO memberships (member_id, party_id, start_date, end_date, position) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(membership.member_id)
    .bind(membership.party_id)
    .bind(membership.start_date)
    .bind(membership.end_date)
    .bind(membership.position)
    .execute(pool)
    .await?;

    Ok(())
}

/// Party history of a member, oldest first
pub async fn memberships_for_member(pool: &SqlitePool, member_id: i64) -> Result<Vec<Membership>> {
    let rows: Vec<(i64, i64, Option<NaiveDate>, Option<NaiveDate>, i64)> = sqlx::query_as(
        "SELECT member_id, party_id, start_date, end_date, position FROM memberships \
         WHERE member_id = ? ORDER BY start_date, id",
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(member_id, party_id, start_date, end_date, position)| Membership {
            member_id,
            party_id,
            start_date,
            end_date,
            position,
        })
        .collect())
}

/// Party of the membership with the newest start date
pub async fn latest_party(pool: &SqlitePool, member_id: i64) -> Result<Option<i64>> {
    let party_id: Option<i64> = sqlx::query_scalar(
        "SELECT party_id FROM memberships WHERE member_id = ? \
         ORDER BY start_date DESC, id DESC LIMIT 1",
    )
    .bind(member_id)
    .fetch_optional(pool)
    .await?;

    Ok(party_id)
}

/// Record an alternate spelling of a member's name
///
/// The name is also registered as an alias of every person linked to the member.
pub async fn add_altname(pool: &SqlitePool, member_id: i64, name: &str) -> Result<()> {
    sqlx::query("INSERT INTO member_altnames (member_id, name) VALUES (?, ?)")
        .bind(member_id)
        .bind(name)
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO person_aliases (person_id, name) \
         SELECT id, ? FROM persons WHERE member_id = ?",
    )
    .bind(name)
    .bind(member_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove an alternate name and the matching person aliases
pub async fn remove_altname(pool: &SqlitePool, member_id: i64, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM member_altnames WHERE member_id = ? AND name = ?")
        .bind(member_id)
        .bind(name)
        .execute(pool)
        .await?;

    sqlx::query(
        "DELETE FROM person_aliases WHERE name = ? \
         AND person_id IN (SELECT id FROM persons WHERE member_id = ?)",
    )
    .bind(name)
    .bind(member_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// The member's name followed by every alternate name
pub async fn member_names(pool: &SqlitePool, member: &Member) -> Result<Vec<String>> {
    let mut names = vec![member.name.clone()];
    if let Some(id) = member.id {
        let altnames: Vec<String> =
            sqlx::query_scalar("SELECT name FROM member_altnames WHERE member_id = ? ORDER BY id")
                .bind(id)
                .fetch_all(pool)
                .await?;
        names.extend(altnames);
    }
    Ok(names)
}
