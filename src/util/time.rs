use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate, Utc};

// Date format the ad server expects for schedule fields.
const REMOTE_DATE_FORMAT: &str = "%m/%d/%Y";

pub fn to_remote_date(d: NaiveDate) -> String {
    d.format(REMOTE_DATE_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// Parse a day string like "today", "+2d", "-1d" or "YYYY-MM-DD".
pub fn parse_day_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("today") {
        return Some(today());
    }
    // "+2d" / "-1d" -> relative to today
    if let Some(stripped) = s.strip_suffix('d') {
        if let Ok(days) = stripped.parse::<i64>() {
            return today().checked_add_signed(Duration::days(days));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// Helper for Option<String> inputs used by CLI flags like --on
pub fn parse_day_opt(on: &Option<String>) -> Result<NaiveDate> {
    let Some(s) = on.as_ref() else { return Ok(today()) };
    match parse_day_str(s) {
        Some(d) => Ok(d),
        None => bail!("unparseable day: {s:?} (expected today, +Nd or YYYY-MM-DD)"),
    }
}
