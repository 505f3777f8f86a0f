//! Weekly plenum presence records

use crate::Result;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPresence {
    pub member_id: i64,
    /// Monday of the week
    pub date: Option<NaiveDate>,
    pub hours: f64,
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Insert a presence row, normalizing its date to the week start
///
/// Callers that keep cached averages should go through
/// `stats::refresh::record_weekly_presence` instead.
pub async fn insert_weekly_presence(pool: &SqlitePool, presence: &WeeklyPresence) -> Result<i64> {
    let result = sqlx::query("INSERT INTO weekly_presence (member_id, date, hours) VALUES (?, ?, ?)")
        .bind(presence.member_id)
        .bind(presence.date.map(week_start))
        .bind(presence.hours)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Presence hours of a member for weeks starting on or after `since`
pub async fn presence_hours_since(pool: &SqlitePool, member_id: i64, since: NaiveDate) -> Result<Vec<f64>> {
    let hours: Vec<f64> = sqlx::query_scalar(
        "SELECT hours FROM weekly_presence WHERE member_id = ? AND date >= ? ORDER BY date",
    )
    .bind(member_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::members::{save_member, Member};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2014-01-29 was a Wednesday
        assert_eq!(week_start(date(2014, 1, 29)), date(2014, 1, 27));
        assert_eq!(week_start(date(2014, 1, 27)), date(2014, 1, 27));
        assert_eq!(week_start(date(2014, 2, 2)), date(2014, 1, 27));
    }

    #[tokio::test]
    async fn test_hours_since_skips_older_weeks_and_undated_rows() {
        let pool = init_memory_database().await.unwrap();
        save_member(&pool, &Member::new(Some(1), "MK")).await.unwrap();

        for (day, hours) in [(Some(date(2012, 12, 3)), 9.0), (Some(date(2013, 3, 6)), 10.5), (None, 3.0)] {
            insert_weekly_presence(&pool, &WeeklyPresence { member_id: 1, date: day, hours })
                .await
                .unwrap();
        }

        let hours = presence_hours_since(&pool, 1, date(2013, 2, 5)).await.unwrap();
        assert_eq!(hours, vec![10.5]);
    }
}
