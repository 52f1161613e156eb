use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use md5::{Digest, Md5};
use regex::{Regex, RegexBuilder};

// Bank prefixes stripped from the start of descriptions (can be expanded).
const PREFIX_PATTERN: &str = r"^(RBC |ROYAL BANK |AMEX )";

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(PREFIX_PATTERN)
            .case_insensitive(true)
            .build()
            .unwrap()
    })
}

/// Collapse whitespace runs, trim, and strip known bank-name prefixes.
/// Empty input yields an empty string.
pub fn clean_description(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }
    let collapsed = whitespace_re().replace_all(description, " ");
    let trimmed = collapsed.trim();
    prefix_re().replace(trimmed, "").to_string()
}

/// Date-only formats tried first, in order; US before EU, as the sources skew
/// North American.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%d %b %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// A date from an adapter: either free text or an already-parsed chrono value.
pub enum DateInput<'a> {
    Text(&'a str),
    Day(NaiveDate),
    Stamp(DateTime<FixedOffset>),
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(s: &'a str) -> Self {
        DateInput::Text(s)
    }
}

impl From<NaiveDate> for DateInput<'_> {
    fn from(d: NaiveDate) -> Self {
        DateInput::Day(d)
    }
}

impl From<DateTime<FixedOffset>> for DateInput<'_> {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        DateInput::Stamp(dt)
    }
}

/// Normalize any adapter-supplied date to `YYYY-MM-DD`.
pub fn normalize_date_value<'a>(input: impl Into<DateInput<'a>>) -> String {
    match input.into() {
        DateInput::Text(s) => normalize_date(s),
        DateInput::Day(d) => d.format("%Y-%m-%d").to_string(),
        DateInput::Stamp(dt) => dt.format("%Y-%m-%d").to_string(),
    }
}

/// Parse a date string into `YYYY-MM-DD`, trying each accepted format in order.
///
/// A string that cannot be parsed is returned verbatim with a printed warning
/// rather than failing: one bad date must not block a whole ledger save.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.format("%Y-%m-%d").to_string();
        }
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return dt.format("%Y-%m-%d").to_string();
        }
    }

    // Already shaped like an ISO date, just not a real calendar day chrono
    // accepts (or oddly zero-padded). Pass it through without complaint.
    static ISO_SHAPE: OnceLock<Regex> = OnceLock::new();
    let iso = ISO_SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
    if !iso.is_match(raw) {
        eprintln!("Warning: could not normalize date '{raw}'");
    }
    raw.to_string()
}

/// Deterministic fallback transaction ID: the MD5 hex digest of the
/// delimiter-joined core fields.
///
/// Two genuinely distinct transactions sharing date, signed amount,
/// description, and account collide to the same ID. Accepted trade-off when
/// the source system has no native transaction ID.
pub fn generate_transaction_id(
    date: &str,
    amount: f64,
    description: &str,
    account_id: &str,
) -> String {
    let raw = format!("{date}|{amount}|{description}|{account_id}");
    let mut hasher = Md5::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
