//! Reporting windows for "windowed" revenue figures.
//!
//! A window is the half-open UTC interval `[start, end)` of the calendar
//! period that contains a given instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Calendar period used for windowed totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportRange {
    /// ISO week, Monday through Sunday.
    Week,
    #[default]
    Month,
    Year,
}

impl ReportRange {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Normalizes a caller-supplied range. Unknown values fall back to `Month`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "weekly" => Self::Week,
            "year" | "yearly" | "annual" => Self::Year,
            _ => Self::Month,
        }
    }

    /// Returns the window of this range containing `now`.
    #[must_use]
    pub fn window_at(&self, now: DateTime<Utc>) -> ReportWindow {
        let today = now.date_naive();
        let (start, end) = match self {
            Self::Week => {
                let start =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (start, start + Duration::days(7))
            }
            Self::Month => {
                let start = month_start(today);
                (start, month_start(start + Duration::days(32)))
            }
            Self::Year => {
                let start = year_start(today);
                (start, year_start(start + Duration::days(367)))
            }
        };

        ReportWindow {
            start: midnight_utc(start),
            end: midnight_utc(end),
        }
    }
}

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
