pub mod checkin;
pub mod config;
pub mod goal;
pub mod progress;

use chrono::NaiveDate;

/// Parse a `YYYY-MM-DD` argument.
pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{raw}' (expected YYYY-MM-DD): {e}").into())
}
