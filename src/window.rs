//! Target date windows for city comparison
//!
//! A window is an inclusive range of calendar days. The default window is
//! the Memorial Day weekend: the Saturday before the last Monday of May
//! through that Monday.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// Supported years for holiday computation
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Whole days covered by the 5-day / 3-hour forecast. The fetch day and the
/// sixth day are only partly covered, so they never count.
pub const FORECAST_HORIZON_DAYS: u32 = 4;

/// Inclusive range of days over which cities are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TargetWindow {
    /// Create a window, rejecting `end` before `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PlannerError> {
        if end < start {
            return Err(PlannerError::validation(format!(
                "Window end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Saturday through Memorial Day Monday for `year`
    pub fn memorial_day_weekend(year: i32) -> Result<Self, PlannerError> {
        let monday = memorial_day(year)?;
        Self::new(monday - Duration::days(2), monday)
    }

    /// The first Memorial Day weekend that has not ended by `today`
    pub fn upcoming_memorial_day_weekend(today: NaiveDate) -> Result<Self, PlannerError> {
        let this_year = Self::memorial_day_weekend(today.year())?;
        if today > this_year.end {
            Self::memorial_day_weekend(today.year() + 1)
        } else {
            Ok(this_year)
        }
    }

    /// `days` consecutive days starting tomorrow
    pub fn next_days(today: NaiveDate, days: u32) -> Result<Self, PlannerError> {
        if !(1..=FORECAST_HORIZON_DAYS).contains(&days) {
            return Err(PlannerError::validation(format!(
                "Number of days must be between 1 and {FORECAST_HORIZON_DAYS}, got: {days}"
            )));
        }
        let start = today + Duration::days(1);
        Self::new(start, start + Duration::days(i64::from(days) - 1))
    }

    /// Last whole day a forecast fetched on `today` covers
    #[must_use]
    pub fn horizon_end(today: NaiveDate) -> NaiveDate {
        today + Duration::days(i64::from(FORECAST_HORIZON_DAYS))
    }

    /// Whether a forecast fetched on `today` covers every day in full
    #[must_use]
    pub fn within_horizon(&self, today: NaiveDate) -> bool {
        self.start > today && self.end <= Self::horizon_end(today)
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the window
    #[must_use]
    pub fn len_days(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every day of the window, in order
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take(self.len_days()).collect()
    }
}

impl fmt::Display for TargetWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%a %b %-d, %Y"),
            self.end.format("%a %b %-d, %Y")
        )
    }
}

/// Last Monday of May
pub fn memorial_day(year: i32) -> Result<NaiveDate, PlannerError> {
    if !SUPPORTED_YEARS.contains(&year) {
        return Err(PlannerError::validation(format!(
            "Year must be between {} and {}, got: {year}",
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )));
    }

    let may_31 = NaiveDate::from_ymd_opt(year, 5, 31)
        .ok_or_else(|| PlannerError::validation(format!("No May 31 in year {year}")))?;
    let back = i64::from(may_31.weekday().num_days_from_monday());
    let monday = may_31 - Duration::days(back);
    debug_assert_eq!(monday.weekday(), Weekday::Mon);
    Ok(monday)
}
