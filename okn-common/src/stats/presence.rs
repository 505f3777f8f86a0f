//! Service time, presence and committee activity calculations

use crate::db::knessets::Knesset;
use crate::db::members::Member;
use crate::time::round_to;
use chrono::{Datelike, NaiveDate};
use tracing::warn;

/// Days the member has served in the given knesset
///
/// `Some(0)` when the member has no start date. `None` when a past member
/// has no end date, which makes the service time unknown.
pub fn service_time(member: &Member, knesset: &Knesset, today: NaiveDate) -> Option<i64> {
    let Some(member_start) = member.start_date else {
        return Some(0);
    };
    let start = member_start.max(knesset.effective_start());

    let end = if member.is_current {
        today
    } else {
        match member.end_date {
            Some(end) => end,
            None => {
                warn!(
                    "Member {} is not current, but has no end date",
                    member.id.unwrap_or_default()
                );
                return None;
            }
        }
    };

    Some((end - start).num_days())
}

/// Completed years since the member's birth, `None` without a birth date
pub fn age(member: &Member, today: NaiveDate) -> Option<i32> {
    let born = member.date_of_birth?;
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    Some(years)
}

/// Mean of the weekly hours rounded to one decimal, `None` without records
pub fn average_weekly_presence(hours: &[f64]) -> Option<f64> {
    if hours.is_empty() {
        return None;
    }
    let total: f64 = hours.iter().sum();
    Some(round_to(total / hours.len() as f64, 1))
}

/// Meetings attended per 30 days of service, rounded to two decimals
///
/// Zero when the service time is unknown or not positive, or the member
/// has not been stored yet.
pub fn committee_meetings_per_month(member: &Member, meetings_attended: i64, service_days: Option<i64>) -> f64 {
    match (member.id, service_days) {
        (Some(_), Some(days)) if days > 0 => round_to(meetings_attended as f64 * 30.0 / days as f64, 2),
        _ => 0.0,
    }
}
