//! Anniversary date arithmetic.
//!
//! Dates in the worksheet are free-form `day/month[/year]` text. Only day and
//! month matter: the next occurrence is computed against a reference date,
//! with 29 February falling back to 28 February in non-leap years.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Year used to validate a day/month pair. Leap, so 29/02 is accepted.
const VALIDATION_YEAR: i32 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Invalid date format: {0:?}")]
    InvalidDateFormat(String),
}

/// The next calendar date an anniversary falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Requested day, before any leap-day substitution
    pub day: u32,
    pub month: u32,
    pub year: i32,
    /// Actual calendar date of the occurrence
    pub date: NaiveDate,
    /// Whole days from the reference date; today is 0
    pub days_until: i64,
}

impl Occurrence {
    /// `DD/MM/YYYY` with the requested day and month.
    pub fn display_date(&self) -> String {
        format!("{:02}/{:02}/{}", self.day, self.month, self.year)
    }
}

/// Parse `day/month[/year]`, tolerating `.`, `-` and space as separators.
pub fn parse_date(raw: &str) -> Result<(u32, u32), DateError> {
    let invalid = || DateError::InvalidDateFormat(raw.to_string());

    let normalized: String = raw
        .trim()
        .chars()
        .map(|c| if matches!(c, '.' | '-' | ' ') { '/' } else { c })
        .collect();
    let mut parts = normalized.split('/');

    let day: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let month: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(VALIDATION_YEAR, month, day).ok_or_else(invalid)?;
    Ok((day, month))
}

/// Compute the next occurrence of `day/month` on or after `reference`.
///
/// `day/month` must already be valid (see [`parse_date`]).
pub fn next_occurrence(day: u32, month: u32, reference: NaiveDate) -> Result<Occurrence, DateError> {
    let this_year = reference.year();
    let date = match anniversary_in(this_year, month, day) {
        Some(date) if date >= reference => date,
        _ => anniversary_in(this_year + 1, month, day)
            .ok_or_else(|| DateError::InvalidDateFormat(format!("{}/{}", day, month)))?,
    };

    Ok(Occurrence {
        day,
        month,
        year: date.year(),
        date,
        days_until: (date - reference).num_days(),
    })
}

/// The anniversary's date in `year`; 29/02 becomes 28/02 in non-leap years.
fn anniversary_in(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        if month == 2 && day == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}
