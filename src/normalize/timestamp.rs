//! ISO-8601 parsing into the mall's civil time zone.
//!
//! The token endpoint mixes naive timestamps (already local civil time) with
//! offset-bearing ones. Naive values are tagged with the civil offset as-is;
//! offset-bearing values are converted so the absolute instant is preserved.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Fixed civil offset of the storefront platform (UTC+9, no DST).
pub const CIVIL_OFFSET_SECS: i32 = 9 * 3600;

pub fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_OFFSET_SECS).expect("+09:00 is a valid offset")
}

/// Express an instant in civil time.
pub fn to_civil(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&civil_offset())
}

// `%#z` also takes hour-only offsets such as `+09`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// chrono needs minutes to build a time, so `2025-10-29T12` (optionally
/// followed by an offset) becomes `2025-10-29T12:00`.
fn pad_hour_only(s: &str) -> Cow<'_, str> {
    let b = s.as_bytes();
    let hour_only = b.len() >= 13
        && matches!(b[10], b'T' | b' ')
        && b[11].is_ascii_digit()
        && b[12].is_ascii_digit()
        && matches!(b.get(13), None | Some(b'+') | Some(b'-') | Some(b'Z'));
    if hour_only {
        Cow::Owned(format!("{}:00{}", &s[..13], &s[13..]))
    } else {
        Cow::Borrowed(s)
    }
}

/// Parse an upstream timestamp and express it in civil time.
pub fn parse_civil(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty timestamp".to_string());
    }
    let padded = pad_hour_only(trimmed);
    let s = padded.as_ref();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&civil_offset()));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&civil_offset()));
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("'{}' is not an ISO-8601 timestamp", s))?;

    naive
        .and_local_timezone(civil_offset())
        .single()
        .ok_or_else(|| format!("'{}' has no single civil-time mapping", s))
}
