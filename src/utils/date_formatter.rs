use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

fn to_zoned(timestamp_ms: i64, tz: Tz) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(timestamp_ms).single()
}

/// Full date-time label used for table rows. Falls back to the raw number
/// when the timestamp is out of chrono's range.
pub fn format_datetime(timestamp_ms: i64, tz: Tz) -> String {
    match to_zoned(timestamp_ms, tz) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => timestamp_ms.to_string(),
    }
}
