use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const COMMON_DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",    // Common format without timezone
  "%Y-%m-%dT%H:%M:%S",    // RFC3339 without offset
];

/// Parse the timestamp formats seen in the wild across RSS and Atom feeds.
/// RFC2822 comes first because that is what RSS `pubDate` carries. Naive
/// timestamps are taken as UTC. Everything this crate compares against the
/// watermark goes through here, so comparisons always happen on normalized
/// UTC instants, never on source strings.
pub fn parse_date(date_str: impl AsRef<str>) -> Option<DateTime<Utc>> {
  let date_str = date_str.as_ref().trim();
  if date_str.is_empty() {
    return None;
  }

  if let Ok(parsed) = DateTime::parse_from_rfc2822(date_str) {
    return Some(parsed.with_timezone(&Utc));
  }

  if let Ok(parsed) = DateTime::parse_from_rfc3339(date_str) {
    return Some(parsed.with_timezone(&Utc));
  }

  for fmt in COMMON_DATE_FORMATS {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(date_str, fmt) {
      return Some(parsed.and_utc());
    }
  }

  if let Ok(parsed) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
    return Some(parsed.and_time(NaiveTime::MIN).and_utc());
  }

  None
}
