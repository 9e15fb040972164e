//! Recency ordering for free-text timestamps.
//!
//! Sources print dates in incompatible shapes: `"5 January 2025"`,
//! `"January 5, 2025 10:30 am"`, `"3 hours ago"`, `"Today"`. There is no shared
//! parser, so each raw string is turned into an [`OrderingKey`] and two keys
//! are compared in layers:
//!
//! 1. both absolute: the later instant first
//! 2. both relative: smaller unit first (minutes, hours, days), then smaller
//!    magnitude first
//! 3. otherwise `today` beats `yesterday` beats everything else
//! 4. otherwise the raw strings are compared lexicographically
//!
//! The last layer is deterministic but carries no meaning; it only exists so a
//! total order is always produced.

use crate::error::OrderingError;
use crate::utils::collapse_whitespace;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Ordering;

static PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:published|posted|updated)\s*(?:on)?\s*:?\s*").unwrap());

static ABBREVIATION_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([a-z]{3,4})\.").unwrap());

static MERIDIEM_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([ap])\.\s?(m)\b\.?").unwrap());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b[a-z]{3,9}\b").unwrap());

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+),?\s+(\d{4})\b(.*)$").unwrap()
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+|an?)\s*(minute|min|hour|hr|day)s?\s+ago\b").unwrap()
});

static TODAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btoday\b").unwrap());
static YESTERDAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\byesterday\b").unwrap());

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const DATETIME_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%Y-%m-%d"];

/// Unit of a relative phrase. Declaration order is recency rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
}

/// Comparable form of a raw timestamp. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingKey {
    Absolute(NaiveDateTime),
    Relative { unit: TimeUnit, magnitude: u32 },
    Today,
    Yesterday,
    Unknown,
}

impl OrderingKey {
    /// Rank used by the categorical layer; lower is newer.
    fn category_rank(&self) -> u8 {
        match self {
            OrderingKey::Today => 0,
            OrderingKey::Yesterday => 1,
            _ => 2,
        }
    }
}

/// Strip bylines such as `"Published:"`, collapse whitespace, spell month
/// abbreviations out in full, turn `a.m.` into `am`, and rewrite
/// `DD Month YYYY` into `Month DD, YYYY`.
pub fn normalize(raw: &str) -> String {
    let stripped = PREFIX.replace(raw, "");
    let meridiem = MERIDIEM_DOTS.replace_all(&stripped, "$1$2");
    let undotted = ABBREVIATION_DOT.replace_all(&meridiem, "$1");
    let spelled = WORD.replace_all(&undotted, |caps: &Captures<'_>| {
        full_month(&caps[0]).unwrap_or_else(|| caps[0].to_string())
    });
    let cleaned = collapse_whitespace(&spelled);

    match DAY_MONTH_YEAR.captures(&cleaned) {
        Some(caps) if full_month(&caps[2]).is_some() => {
            format!("{} {}, {}{}", &caps[2], &caps[1], &caps[3], &caps[4])
        }
        _ => cleaned,
    }
}

/// Full capitalised month name for any 3+ letter prefix of one
/// (`"Sept"`, `"jan"`, `"March"`).
fn full_month(word: &str) -> Option<String> {
    let lower = word.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    let month = MONTHS.iter().find(|m| m.starts_with(lower.as_str()))?;
    let mut name = month.to_string();
    name[..1].make_ascii_uppercase();
    Some(name)
}

/// Parse an already-normalized string as an absolute instant.
///
/// Zoned formats are converted to UTC; zone-less ones are taken as-is.
pub fn parse_absolute(normalized: &str) -> Option<NaiveDateTime> {
    let s = normalized.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Find an `N <unit>(s) ago` phrase anywhere in the string.
pub fn parse_relative(normalized: &str) -> Result<Option<(TimeUnit, u32)>, OrderingError> {
    let Some(caps) = RELATIVE.captures(normalized) else {
        return Ok(None);
    };

    let count = &caps[1];
    let magnitude = if count.eq_ignore_ascii_case("a") || count.eq_ignore_ascii_case("an") {
        1
    } else {
        count
            .parse::<u32>()
            .map_err(|_| OrderingError::MagnitudeOverflow(count.to_string()))?
    };

    let unit = match caps[2].to_ascii_lowercase().as_str() {
        "minute" | "min" => TimeUnit::Minute,
        "hour" | "hr" => TimeUnit::Hour,
        _ => TimeUnit::Day,
    };
    Ok(Some((unit, magnitude)))
}

/// Derive the ordering key for a raw timestamp.
pub fn ordering_key(raw: &str) -> Result<OrderingKey, OrderingError> {
    let normalized = normalize(raw);
    if let Some(instant) = parse_absolute(&normalized).or_else(|| parse_absolute(raw)) {
        return Ok(OrderingKey::Absolute(instant));
    }
    if let Some((unit, magnitude)) = parse_relative(&normalized)? {
        return Ok(OrderingKey::Relative { unit, magnitude });
    }
    if TODAY.is_match(&normalized) {
        return Ok(OrderingKey::Today);
    }
    if YESTERDAY.is_match(&normalized) {
        return Ok(OrderingKey::Yesterday);
    }
    Ok(OrderingKey::Unknown)
}

/// Compare two raw timestamps. `Ordering::Less` means `a` is newer.
pub fn compare_raw(a: &str, b: &str) -> Result<Ordering, OrderingError> {
    let ka = ordering_key(a)?;
    let kb = ordering_key(b)?;
    Ok(compare_keys(&ka, &kb, a, b))
}

/// Layered comparison of two keys; the raw strings are only used by the
/// lexicographic fallback.
pub fn compare_keys(ka: &OrderingKey, kb: &OrderingKey, raw_a: &str, raw_b: &str) -> Ordering {
    match (ka, kb) {
        (OrderingKey::Absolute(x), OrderingKey::Absolute(y)) => y.cmp(x),
        (
            OrderingKey::Relative { unit: ua, magnitude: ma },
            OrderingKey::Relative { unit: ub, magnitude: mb },
        ) => ua.cmp(ub).then(ma.cmp(mb)),
        _ => {
            let (ra, rb) = (ka.category_rank(), kb.category_rank());
            if ra != rb || ra < 2 {
                ra.cmp(&rb)
            } else {
                raw_a.cmp(raw_b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_normalize_strips_prefixes() {
        assert_eq!(normalize("Published: January 5, 2025"), "January 5, 2025");
        assert_eq!(normalize("POSTED:  3 hours ago"), "3 hours ago");
        assert_eq!(normalize("updated: Today"), "Today");
        assert_eq!(normalize("Published On 5 Jan 2025"), "January 5, 2025");
    }

    #[test]
    fn test_normalize_rewrites_day_month_year() {
        assert_eq!(normalize("05 January 2025"), "January 05, 2025");
        assert_eq!(normalize("5th Jan. 2025 10:30 am"), "January 5, 2025 10:30 am");
        assert_eq!(normalize("5 Sept 2025"), "September 5, 2025");
        assert_eq!(normalize("Oct. 2, 2025 4:05 p.m."), "October 2, 2025 4:05 pm");
        // Not a month; left untouched.
        assert_eq!(normalize("12 things 2025"), "12 things 2025");
    }

    #[test]
    fn test_parse_absolute_formats() {
        let dt = parse_absolute("January 5, 2025 10:30 pm").unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour(), dt.minute()), (1, 5, 22, 30));

        let dt = parse_absolute(&normalize("5 January 2025")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 1, 5));

        let dt = parse_absolute(&normalize("5 Sept 2025")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 9, 5));
        assert!(parse_absolute(&normalize("Sept 5, 2025")).is_some());

        let dt = parse_absolute(&normalize("January 5, 2025 10:30 a.m.")).unwrap();
        assert_eq!((dt.hour(), dt.minute()), (10, 30));
        let dt = parse_absolute(&normalize("Jan. 5, 2025 10:30 P.M.")).unwrap();
        assert_eq!(dt.hour(), 22);

        assert!(parse_absolute("2025-01-05T10:00:00Z").is_some());
        assert!(parse_absolute("Sun, 05 Jan 2025 10:00:00 +0000").is_some());
        assert!(parse_absolute("2025-01-05").is_some());
        assert!(parse_absolute("3 hours ago").is_none());
        assert!(parse_absolute("").is_none());
    }

    #[test]
    fn test_abbreviated_months_and_dotted_meridiem_order_by_date() {
        assert!(matches!(ordering_key("5 Sept 2025").unwrap(), OrderingKey::Absolute(_)));
        assert!(matches!(ordering_key("Sept 5, 2025").unwrap(), OrderingKey::Absolute(_)));
        assert!(matches!(
            ordering_key("January 5, 2025 10:30 a.m.").unwrap(),
            OrderingKey::Absolute(_)
        ));
        assert!(matches!(
            ordering_key("Sun, 05 Jan 2025 10:00:00 +0000").unwrap(),
            OrderingKey::Absolute(_)
        ));
        // Lexicographically "5 Sept 2025" < "Jan...", by date it is newer.
        assert_eq!(compare_raw("Jan. 5, 2025 10:30 a.m.", "5 Sept 2025").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(parse_relative("3 hours ago").unwrap(), Some((TimeUnit::Hour, 3)));
        assert_eq!(parse_relative("1 minute ago").unwrap(), Some((TimeUnit::Minute, 1)));
        assert_eq!(parse_relative("an hour ago").unwrap(), Some((TimeUnit::Hour, 1)));
        assert_eq!(parse_relative("Updated 2 days ago").unwrap(), Some((TimeUnit::Day, 2)));
        assert_eq!(parse_relative("15 mins ago").unwrap(), Some((TimeUnit::Minute, 15)));
        assert_eq!(parse_relative("yesterday").unwrap(), None);
    }

    #[test]
    fn test_parse_relative_overflow_is_error() {
        let err = parse_relative("99999999999 hours ago").unwrap_err();
        assert_eq!(err, OrderingError::MagnitudeOverflow("99999999999".into()));
    }

    #[test]
    fn test_absolute_later_instant_first() {
        assert_eq!(
            compare_raw("January 6, 2025", "January 5, 2025").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_raw("4 January 2025", "Published: January 5, 2025 09:00 am").unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_hours_before_days_regardless_of_magnitude() {
        for n in [1, 5, 23, 500] {
            for m in [1, 2, 30] {
                let hours = format!("{n} hours ago");
                let days = format!("{m} days ago");
                assert_eq!(compare_raw(&hours, &days).unwrap(), Ordering::Less);
                assert_eq!(compare_raw(&days, &hours).unwrap(), Ordering::Greater);
            }
        }
        assert_eq!(compare_raw("59 minutes ago", "1 hour ago").unwrap(), Ordering::Less);
    }

    #[test]
    fn test_smaller_magnitude_first_within_unit() {
        assert_eq!(compare_raw("3 hours ago", "1 hour ago").unwrap(), Ordering::Greater);
        assert_eq!(compare_raw("1 hour ago", "3 hours ago").unwrap(), Ordering::Less);
        assert_eq!(compare_raw("2 days ago", "2 days ago").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_categorical_precedence() {
        assert_eq!(compare_raw("Today", "Yesterday").unwrap(), Ordering::Less);
        assert_eq!(compare_raw("Yesterday", "last week").unwrap(), Ordering::Less);
        assert_eq!(compare_raw("some time", "Today").unwrap(), Ordering::Greater);
        assert_eq!(compare_raw("today 10am", "Today").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_lexicographic_fallback() {
        assert_eq!(compare_raw("alpha", "beta").unwrap(), Ordering::Less);
        // Mixed representation classes fall through to the raw strings too.
        assert_eq!(
            compare_raw("2 hours ago", "January 5, 2025").unwrap(),
            "2 hours ago".cmp("January 5, 2025")
        );
    }

    #[test]
    fn test_ordering_key_classification() {
        assert_eq!(ordering_key("Yesterday").unwrap(), OrderingKey::Yesterday);
        assert_eq!(ordering_key("").unwrap(), OrderingKey::Unknown);
        assert!(matches!(
            ordering_key("posted: 10 min ago").unwrap(),
            OrderingKey::Relative { unit: TimeUnit::Minute, magnitude: 10 }
        ));
    }
}
