//! Date formats used in the sheet.
//!
//! The month sheet name is the partition key for expense rows, so every read and write must derive
//! it through `month_sheet_name`. chrono's `%B` is always English, which keeps the name independent
//! of the machine's locale.

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, TimeZone};

/// Expense dates are stored as `DD-MM-YYYY`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Write timestamps are stored as `DD-MM-YYYY HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Returns the name of the sheet that holds expenses for the month of `date`, e.g.
/// `November 2025`.
pub fn month_sheet_name(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `DD-MM-YYYY` date.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("'{s}' is not a date in DD-MM-YYYY format"))
}

pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Today's date as `DD-MM-YYYY`.
pub fn current_date() -> String {
    format_date(today())
}
