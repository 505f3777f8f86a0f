//! Party and coalition membership records

use crate::time::within;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

/// A party list in a given knesset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub id: Option<i64>,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_coalition: bool,
    pub number_of_members: Option<i64>,
    /// Last known number of seats
    pub number_of_seats: Option<i64>,
    pub knesset_id: Option<i64>,
    pub split_from: Option<i64>,
}

impl Party {
    pub fn new(name: &str, knesset_id: Option<i64>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            start_date: None,
            end_date: None,
            is_coalition: false,
            number_of_members: None,
            number_of_seats: None,
            knesset_id,
            split_from: None,
        }
    }

    pub fn affiliation(&self) -> &'static str {
        if self.is_coalition {
            "Coalition"
        } else {
            "Opposition"
        }
    }

    pub fn name_with_dashes(&self) -> String {
        self.name.replace('\'', "\"").replace(' ', "-")
    }

    /// Display name, qualified by knesset for parties of past terms
    pub fn display_name(&self, current_knesset: Option<i64>) -> String {
        if self.is_current(current_knesset) {
            return self.name.clone();
        }
        format!("{} in Knesset {}", self.name, self.knesset_id.unwrap_or(0))
    }

    pub fn is_current(&self, current_knesset: Option<i64>) -> bool {
        self.knesset_id == current_knesset
    }
}

/// A period during which a party sat in the coalition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoalitionMembership {
    pub party_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Number of seats a party held over a period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartySeats {
    pub party_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub number_of_seats: Option<i64>,
}

/// True when any of the coalition periods covers `date`
pub fn coalition_covers(memberships: &[CoalitionMembership], date: NaiveDate) -> bool {
    memberships
        .iter()
        .any(|m| within(date, m.start_date, m.end_date))
}

const PARTY_COLUMNS: &str = "id, name, start_date, end_date, is_coalition, number_of_members, \
                             number_of_seats, knesset_id, split_from";

fn party_from_row(row: &sqlx::sqlite::SqliteRow) -> Party {
    Party {
        id: row.get("id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_coalition: row.get("is_coalition"),
        number_of_members: row.get("number_of_members"),
        number_of_seats: row.get("number_of_seats"),
        knesset_id: row.get("knesset_id"),
        split_from: row.get("split_from"),
    }
}

/// Insert a new party or update an existing one, returning its id
///
/// An explicit id that does not exist yet is inserted under that id.
pub async fn save_party(pool: &SqlitePool, party: &Party) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO parties (id, name, start_date, end_date, is_coalition, number_of_members,
            number_of_seats, knesset_id, split_from)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            is_coalition = excluded.is_coalition,
            number_of_members = excluded.number_of_members,
            number_of_seats = excluded.number_of_seats,
            knesset_id = excluded.knesset_id,
            split_from = excluded.split_from
        "#,
    )
    .bind(party.id)
    .bind(&party.name)
    .bind(party.start_date)
    .bind(party.end_date)
    .bind(party.is_coalition)
    .bind(party.number_of_members)
    .bind(party.number_of_seats)
    .bind(party.knesset_id)
    .bind(party.split_from)
    .execute(pool)
    .await?;

    Ok(party.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn load_party(pool: &SqlitePool, id: i64) -> Result<Option<Party>> {
    let row = sqlx::query(&format!("SELECT {} FROM parties WHERE id = ?", PARTY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(party_from_row))
}

/// Parties of a knesset, largest first
pub async fn list_parties_for_knesset(pool: &SqlitePool, knesset: i64) -> Result<Vec<Party>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM parties WHERE knesset_id = ? ORDER BY number_of_seats DESC, name",
        PARTY_COLUMNS
    ))
    .bind(knesset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(party_from_row).collect())
}

pub async fn add_coalition_membership(
    pool: &SqlitePool,
    membership: &CoalitionMembership,
) -> Result<()> {
    sqlx::query("INSERT INTO coalition_memberships (party_id, start_date, end_date) VALUES (?, ?, ?)")
        .bind(membership.party_id)
        .bind(membership.start_date)
        .bind(membership.end_date)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn coalition_memberships(
    pool: &SqlitePool,
    party_id: i64,
) -> Result<Vec<CoalitionMembership>> {
    let rows: Vec<(i64, Option<NaiveDate>, Option<NaiveDate>)> = sqlx::query_as(
        "SELECT party_id, start_date, end_date FROM coalition_memberships \
         WHERE party_id = ? ORDER BY start_date",
    )
    .bind(party_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(party_id, start_date, end_date)| CoalitionMembership {
            party_id,
            start_date,
            end_date,
        })
        .collect())
}

/// Was the party part of the coalition on the given date
pub async fn is_coalition_at(pool: &SqlitePool, party_id: i64, date: NaiveDate) -> Result<bool> {
    let memberships = coalition_memberships(pool, party_id).await?;
    Ok(coalition_covers(&memberships, date))
}

pub async fn add_party_seats(pool: &SqlitePool, seats: &PartySeats) -> Result<()> {
    sqlx::query(
        "INSERT INTO party_seats (party_id, start_date, end_date, number_of_seats) VALUES (?, ?, ?, ?)",
    )
    .bind(seats.party_id)
    .bind(seats.start_date)
    .bind(seats.end_date)
    .bind(seats.number_of_seats)
    .execute(pool)
    .await?;

    Ok(())
}

/// Seat history of a party, oldest period first
pub async fn party_seats(pool: &SqlitePool, party_id: i64) -> Result<Vec<PartySeats>> {
    let rows: Vec<(i64, NaiveDate, Option<NaiveDate>, Option<i64>)> = sqlx::query_as(
        "SELECT party_id, start_date, end_date, number_of_seats FROM party_seats \
         WHERE party_id = ? ORDER BY start_date",
    )
    .bind(party_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(party_id, start_date, end_date, number_of_seats)| PartySeats {
            party_id,
            start_date,
            end_date,
            number_of_seats,
        })
        .collect())
}

/// Ancestors of a party through `split_from`, nearest first
pub async fn party_lineage(pool: &SqlitePool, party_id: i64) -> Result<Vec<Party>> {
    let mut lineage = Vec::new();
    let mut seen = HashSet::from([party_id]);

    let start = load_party(pool, party_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("party {}", party_id)))?;

    let mut next = start.split_from;
    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            break;
        }
        match load_party(pool, parent_id).await? {
            Some(parent) => {
                next = parent.split_from;
                lineage.push(parent);
            }
            None => break,
        }
    }

    Ok(lineage)
}
