// src/common/clock.rs

use chrono::{FixedOffset, NaiveDate, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current wall-clock time in the configured offset, as stored in the tables.
pub fn now_local(offset: &FixedOffset) -> String {
    Utc::now().with_timezone(offset).format(TIMESTAMP_FORMAT).to_string()
}

pub fn today_local(offset: &FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(offset).date_naive()
}

/// Compact stamp used in backup file names, e.g. `20251110_0915`.
pub fn backup_stamp(offset: &FixedOffset) -> String {
    Utc::now().with_timezone(offset).format("%Y%m%d_%H%M").to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}
