//! Common utilities and helper functions
//!
//! Day-range arithmetic and the two date renderings used by the fetcher:
//! `DD-MM-YYYY` on the wire and ISO `YYYY-MM-DD` in the destination tables.

pub mod error;
pub mod retry;

use chrono::{Days, NaiveDate};

use crate::error::{Error, Result};

/// Date format expected by the remote API's `date` parameter
pub const API_DATE_FORMAT: &str = "%d-%m-%Y";

/// Date format of the `TDATE` column in destination tables
pub const STORE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest `--days` value accepted (about ten years of history)
pub const MAX_DAYS: u32 = 3660;

/// Parse the `--days` argument
///
/// Only integers in `1..=MAX_DAYS` are accepted. Zero, negatives, oversized
/// and non-numeric input are rejected before anything touches the network.
pub fn parse_days(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| Error::validation(format!("--days must be a positive integer, got '{trimmed}'")))?;

    if value <= 0 {
        return Err(Error::validation(format!(
            "--days must be a positive integer, got {value}"
        )));
    }

    match u32::try_from(value) {
        Ok(days) if days <= MAX_DAYS => Ok(days),
        _ => Err(Error::validation(format!(
            "--days must be at most {MAX_DAYS}, got {value}"
        ))),
    }
}

/// Inclusive range of `days` calendar days ending at the day before `today`,
/// oldest first
///
/// # Errors
///
/// `Error::Validation` if `days` exceeds [`MAX_DAYS`] or the range leaves
/// the representable calendar.
pub fn day_range(today: NaiveDate, days: u32) -> Result<Vec<NaiveDate>> {
    if days > MAX_DAYS {
        return Err(Error::validation(format!(
            "--days must be at most {MAX_DAYS}, got {days}"
        )));
    }

    let out_of_range = || Error::validation(format!("{days} days before {today} is out of range"));
    let yesterday = today.checked_sub_days(Days::new(1)).ok_or_else(out_of_range)?;

    (0..u64::from(days))
        .rev()
        .map(|offset| {
            yesterday
                .checked_sub_days(Days::new(offset))
                .ok_or_else(out_of_range)
        })
        .collect()
}

/// Render a date for the API query string
pub fn api_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// Render a date for the `TDATE` column
pub fn store_date(date: NaiveDate) -> String {
    date.format(STORE_DATE_FORMAT).to_string()
}
