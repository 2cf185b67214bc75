//! Named look-back windows for choosing a retrieval start time.

use crate::domain::UnixTime;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOption {
    /// Rolling 24 hours.
    Day,
    /// Rolling 7 days.
    Week,
    /// Rolling 30 days.
    Month,
    /// Rolling 365 days.
    Year,
    /// Midnight UTC today.
    DayStart,
    /// Monday 00:00 UTC of the current week.
    WeekStart,
    /// First day of the current month, 00:00 UTC.
    MonthStart,
    /// January 1st of the current year, 00:00 UTC.
    YearStart,
}

impl RangeOption {
    /// Window start relative to `now`.
    pub fn start_from(&self, now: DateTime<Utc>) -> UnixTime {
        let today = now.date_naive();
        let start = match self {
            RangeOption::Day => return UnixTime::new((now - Duration::days(1)).timestamp()),
            RangeOption::Week => return UnixTime::new((now - Duration::days(7)).timestamp()),
            RangeOption::Month => return UnixTime::new((now - Duration::days(30)).timestamp()),
            RangeOption::Year => return UnixTime::new((now - Duration::days(365)).timestamp()),
            RangeOption::DayStart => today,
            RangeOption::WeekStart => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            RangeOption::MonthStart => {
                NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
            }
            RangeOption::YearStart => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        let midnight = start.and_hms_opt(0, 0, 0).unwrap_or_default();
        UnixTime::new(Utc.from_utc_datetime(&midnight).timestamp())
    }

    /// Window start relative to the current wall-clock time.
    pub fn start(&self) -> UnixTime {
        self.start_from(Utc::now())
    }
}

impl FromStr for RangeOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(RangeOption::Day),
            "week" => Ok(RangeOption::Week),
            "month" => Ok(RangeOption::Month),
            "year" => Ok(RangeOption::Year),
            "day_start" => Ok(RangeOption::DayStart),
            "week_start" => Ok(RangeOption::WeekStart),
            "month_start" => Ok(RangeOption::MonthStart),
            "year_start" => Ok(RangeOption::YearStart),
            other => Err(format!(
                "must be day, week, month, year, day_start, week_start, month_start, or year_start, got {}",
                other
            )),
        }
    }
}
