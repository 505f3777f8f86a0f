//! Knesset (legislative term) records

use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Start of the first Knesset, used when a term has no recorded start
pub fn first_knesset_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1949, 2, 14).unwrap_or(NaiveDate::MIN)
}

/// A legislative term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Knesset {
    pub number: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Knesset {
    pub fn new(number: i64, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            number,
            start_date,
            end_date,
        }
    }

    pub fn name(&self) -> String {
        format!("Knesset {}", self.number)
    }

    /// Start date used for statistics windows
    pub fn effective_start(&self) -> NaiveDate {
        self.start_date.unwrap_or_else(first_knesset_start)
    }

    /// `[start, end or today]`
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.effective_start(), self.end_date.unwrap_or(today))
    }
}

fn knesset_from_row(row: &sqlx::sqlite::SqliteRow) -> Knesset {
    Knesset {
        number: row.get("number"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
    }
}

/// Insert or update a knesset
pub async fn save_knesset(pool: &SqlitePool, knesset: &Knesset) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO knessets (number, start_date, end_date) VALUES (?, ?, ?)
        ON CONFLICT(number) DO UPDATE SET
            start_date = excluded.start_date,
            end_date = excluded.end_date
        "#,
    )
    .bind(knesset.number)
    .bind(knesset.start_date)
    .bind(knesset.end_date)
    .execute(pool)
    .await?;

    Ok(())
}

/// The current knesset is the one with the highest number
pub async fn current_knesset(pool: &SqlitePool) -> Result<Option<Knesset>> {
    let row = sqlx::query("SELECT number, start_date, end_date FROM knessets ORDER BY number DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(knesset_from_row))
}

pub async fn load_knesset(pool: &SqlitePool, number: i64) -> Result<Option<Knesset>> {
    let row = sqlx::query("SELECT number, start_date, end_date FROM knessets WHERE number = ?")
        .bind(number)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(knesset_from_row))
}
