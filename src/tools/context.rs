//! Current date/time context attached to event listings, so the model can
//! resolve "next Tuesday" without guessing.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Local, TimeZone};
use serde::Serialize;

/// Snapshot of "now" in the local zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatetimeContext {
    /// `YYYY-MM-DD`.
    pub current_date: String,
    /// `HH:MM:SS`.
    pub current_time: String,
    /// English weekday name.
    pub day_of_week: String,
    /// UTC offset, e.g. `+02:00`.
    pub timezone: String,
    /// Dates of the next seven days keyed by weekday name.
    pub upcoming_days: BTreeMap<String, String>,
}

fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

/// Context for the current local time.
pub fn datetime_context() -> DatetimeContext {
    datetime_context_at(&Local::now())
}

/// Context for an arbitrary instant.
pub fn datetime_context_at<Tz: TimeZone>(now: &DateTime<Tz>) -> DatetimeContext
where
    Tz::Offset: std::fmt::Display,
{
    let upcoming_days = (1..=7)
        .map(|offset| {
            let day = now.clone() + Duration::days(offset);
            (
                weekday_name(day.weekday()).to_owned(),
                day.format("%Y-%m-%d").to_string(),
            )
        })
        .collect();

    DatetimeContext {
        current_date: now.format("%Y-%m-%d").to_string(),
        current_time: now.format("%H:%M:%S").to_string(),
        day_of_week: weekday_name(now.weekday()).to_owned(),
        timezone: now.format("%:z").to_string(),
        upcoming_days,
    }
}
