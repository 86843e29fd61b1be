//! IMAP date formatting.

use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Formats a date the way SEARCH expects it: `3-Feb-2011`.
///
/// The day is not zero-padded and the month is always the English
/// abbreviation, independent of locale.
#[must_use]
pub fn format_imap_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{}-{}-{}", date.day(), month, date.year())
}
