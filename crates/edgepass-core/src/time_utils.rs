use chrono::{DateTime, Utc};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Converts whole Unix seconds into a UTC instant, `None` when out of range.
pub fn unix_timestamp_to_utc(unix_seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
}

/// Renders an instant as an IMF-fixdate HTTP-date (RFC 9110 section 5.6.7).
pub fn format_http_date(instant: DateTime<Utc>) -> String {
    instant.format(HTTP_DATE_FORMAT).to_string()
}
