pub mod config;
pub mod goal;
pub mod metric;
pub mod reminder;
pub mod watch;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Parse a timestamp argument: RFC 3339, or `YYYY-MM-DD HH:MM` in local time.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .map_err(|_| format!("cannot parse '{s}' as RFC 3339 or 'YYYY-MM-DD HH:MM'"))?;
    let local = Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("'{s}' is ambiguous in the local timezone"))?;
    Ok(local.with_timezone(&Utc))
}
