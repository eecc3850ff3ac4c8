//! Text and timestamp normalization shared by the parsers.

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::UtcDateTime;

const NAIVE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Named zones seen in RFC 822 feed dates, as numeric offsets.
const ZONE_NAMES: &[(&str, &str)] = &[
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("UT", "+0000"),
    ("Z", "+0000"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("JST", "+0900"),
];

/// Decode HTML entities, then collapse runs of whitespace to single spaces.
pub fn clean_text(value: &str) -> String {
    let decoded = html_escape::decode_html_entities(value);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a feed or API timestamp; `fallback` is used when `raw` is absent
/// or unparseable.
pub fn parse_published(raw: Option<&str>, fallback: UtcDateTime) -> UtcDateTime {
    raw.and_then(try_parse_timestamp).unwrap_or(fallback)
}

/// RFC 2822, RFC 3339, naive ISO date-time (UTC), or plain date (UTC midnight).
pub fn try_parse_timestamp(raw: &str) -> Option<UtcDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(&numeric_zone(value), &Rfc2822) {
        return Some(UtcDateTime::from_offset_datetime(parsed));
    }
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(UtcDateTime::from_offset_datetime(parsed));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = PrimitiveDateTime::parse(value, format) {
            return Some(UtcDateTime::from_offset_datetime(parsed.assume_utc()));
        }
    }
    Date::parse(value, DATE_FORMAT)
        .ok()
        .map(|date| UtcDateTime::from_offset_datetime(date.midnight().assume_utc()))
}

fn numeric_zone(value: &str) -> String {
    if let Some((head, zone)) = value.rsplit_once(' ') {
        if let Some((_, offset)) = ZONE_NAMES.iter().find(|(name, _)| *name == zone) {
            return format!("{head} {offset}");
        }
    }
    value.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> UtcDateTime {
        UtcDateTime::parse_rfc3339("2000-01-01T00:00:00Z").expect("fallback")
    }

    #[test]
    fn cleans_entities_and_whitespace() {
        assert_eq!(clean_text("  Tom &amp; Jerry\n\t&lt;b&gt;  "), "Tom & Jerry <b>");
        assert_eq!(clean_text("caf&eacute;&nbsp;bar"), "café bar");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn parses_rfc822_with_named_zone() {
        let parsed = parse_published(Some("Tue, 10 Jun 2003 04:00:00 GMT"), fallback());
        assert_eq!(parsed.format_rfc3339(), "2003-06-10T04:00:00Z");
    }

    #[test]
    fn parses_rfc822_with_numeric_offset() {
        let parsed = parse_published(Some("Mon, 01 Jan 2024 09:00:00 +0900"), fallback());
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn parses_iso_variants_as_utc() {
        let parsed = parse_published(Some("2024-03-05T10:20:30+09:00"), fallback());
        assert_eq!(parsed.format_rfc3339(), "2024-03-05T01:20:30Z");

        let naive = parse_published(Some("2024-03-05T10:20:30"), fallback());
        assert_eq!(naive.format_rfc3339(), "2024-03-05T10:20:30Z");

        let date = parse_published(Some("2024-03-05"), fallback());
        assert_eq!(date.format_rfc3339(), "2024-03-05T00:00:00Z");
    }

    #[test]
    fn falls_back_when_missing_or_unparseable() {
        assert_eq!(parse_published(None, fallback()), fallback());
        assert_eq!(parse_published(Some("  "), fallback()), fallback());
        assert_eq!(parse_published(Some("2024000101"), fallback()), fallback());
    }
}
