use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::time::SystemTime;

use crate::constants::TIMESTAMP_FORMAT;

/// Formats that carry an explicit offset
const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y, %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Format a timestamp in the canonical record format
pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Normalize a raw timestamp, substituting `now` when nothing matches
pub fn normalize_timestamp(raw: &str, now: NaiveDateTime) -> String {
    format_timestamp(&parse_timestamp(raw, now).unwrap_or(now))
}

/// Parse a timestamp in any of the formats seen in host logs.
///
/// Zone-aware inputs are converted to local wall-clock time. Inputs without a
/// year (syslog, `last`) get the year of `now`, or the previous one when that
/// would put them more than a day in the future.
pub fn parse_timestamp(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let raw = collapsed.as_str();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(to_local(dt));
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(to_local(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t);
        }
    }
    if let Some(t) = parse_cim_datetime(raw) {
        return Some(t);
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    if let Some(t) = parse_without_year(raw, now) {
        return Some(t);
    }
    if (9..=10).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<i64>().ok().and_then(from_epoch);
    }
    None
}

/// Local wall-clock time for seconds since the epoch
pub fn from_epoch(secs: i64) -> Option<NaiveDateTime> {
    Local.timestamp_opt(secs, 0).single().map(|dt| dt.naive_local())
}

/// Canonical text for a filesystem time
pub fn format_system_time(t: SystemTime) -> String {
    let local: DateTime<Local> = DateTime::from(t);
    format_timestamp(&local.naive_local())
}

fn to_local(dt: DateTime<FixedOffset>) -> NaiveDateTime {
    dt.with_timezone(&Local).naive_local()
}

/// WMI CIM datetime: `yyyymmddHHMMSS.ffffff+UUU`, offset in minutes
fn parse_cim_datetime(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() < 14 || !raw.as_bytes()[..14].iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(&raw[..14], "%Y%m%d%H%M%S").ok()?;
    let rest = &raw[14..];
    let Some(sign_pos) = rest.find(|c| c == '+' || c == '-') else {
        return Some(naive);
    };
    let minutes: i32 = match rest[sign_pos + 1..].parse() {
        Ok(m) => m,
        Err(_) => return Some(naive),
    };
    let minutes = if rest.as_bytes()[sign_pos] == b'-' { -minutes } else { minutes };
    let offset = FixedOffset::east_opt(minutes * 60)?;
    let zoned = offset.from_local_datetime(&naive).single()?;
    Some(to_local(zoned))
}

/// syslog `Oct 14 09:47:01` and `last` style `Tue May 29 10:36`
fn parse_without_year(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.first().map_or(false, |t| WEEKDAYS.contains(t)) {
        tokens.remove(0);
    }
    if tokens.len() != 3 {
        return None;
    }
    let collapsed = tokens.join(" ");

    let parse_in = |year: i32| {
        let candidate = format!("{} {}", year, collapsed);
        NaiveDateTime::parse_from_str(&candidate, "%Y %b %d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&candidate, "%Y %b %d %H:%M"))
            .ok()
    };

    // Feb 29 only exists in some years; a failed parse falls back too
    parse_in(now.year())
        .filter(|t| *t <= now + Duration::days(1))
        .or_else(|| parse_in(now.year() - 1))
}
