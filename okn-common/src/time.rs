//! Date utilities

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Get today's local date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Get the current local timestamp
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// True when `date` falls inside `[start, end]`; a missing bound is open
pub fn within(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| s <= date) && end.map_or(true, |e| e >= date)
}

/// Round to a fixed number of decimal places, halves away from zero
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
