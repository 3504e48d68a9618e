//! # Identifiers and Timestamps
//!
//! Entity IDs look like `cust_1700000000000_k3j9x0a1b`:
//! ```text
//! {prefix}_{epochMillis}_{9 lowercase alphanumerics}
//! ```
//! The random tail comes from a v4 UUID, so two IDs minted in the same
//! millisecond still differ.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Length of the random segment of a generated ID.
const RANDOM_SEGMENT_LEN: usize = 9;

/// Generates a fresh entity ID with the given prefix.
///
/// ## Example
/// ```rust
/// use estate_core::ids::generate_id;
///
/// let id = generate_id("cust");
/// assert!(id.starts_with("cust_"));
/// assert_eq!(id.split('_').count(), 3);
/// ```
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(RANDOM_SEGMENT_LEN)
        .collect();
    format!("{prefix}_{millis}_{random}")
}

/// Current time as an RFC 3339 string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses the date formats found in backups and spreadsheets.
///
/// Accepts RFC 3339 (`2024-03-05T10:00:00.000Z`), naive date-times with or
/// without fractional seconds, plain `YYYY-MM-DD` and `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"]
        .into_iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
