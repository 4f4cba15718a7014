//! Field parsing for statement cells and OCR'd text
//!
//! Amounts and dates arrive in every shape imaginable: `₹1,200.00`, `(450.00)`,
//! `Rs. 99`, `15/01/2024`, `15-Jan-24`. These helpers normalize them without
//! ever failing loudly; callers decide what an unparseable field means.

use std::sync::OnceLock;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Longest description kept on a transaction
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Amount-like substring as it appears inside OCR text lines
pub const INLINE_AMOUNT_PATTERN: &str = r"[₹$]?\s*-?\s*\d{1,3}(?:,\d{3})*\.?\d{0,2}";

/// Date formats tried in order. Two-digit-year variants precede their
/// four-digit twins; `%y` consumes exactly two digits so `2024` falls through.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

fn cell_amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\(?\s*(?:₹|\$|rs\.?|inr)?\s*[-+]?\s*\d[\d,]*(?:\.\d+)?\s*\)?\s*(?:cr|dr)?$")
            .expect("valid regex")
    })
}

fn cell_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:\d{1,4}[/\-.]\d{1,2}[/\-.]\d{1,4}|\d{1,2}[\s\-][a-z]{3,9}[\s\-,]+\d{2,4}|[a-z]{3,9}\s+\d{1,2},?\s+\d{4})(?:[T\s].*)?$",
        )
        .expect("valid regex")
    })
}

/// Parse a number the way a lenient float parser does: skip leading
/// whitespace, then take the longest valid decimal prefix (`"12.5abc"` → 12.5).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Optional exponent, only when it carries digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Strip currency markers, separators, whitespace and parenthetical negative
/// notation, leaving something `parse_float_prefix` can read.
pub fn clean_amount(raw: &str) -> String {
    let mut s: String = raw
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();

    let lower = s.to_lowercase();
    for prefix in ["inr", "rs."] {
        if lower.starts_with(prefix) {
            s = s[prefix.len()..].to_string();
            break;
        }
    }
    if s.to_lowercase().starts_with("rs") {
        s = s[2..].to_string();
    }

    if s.starts_with('(') && s.contains(')') {
        s = format!("-{}", s.replace(['(', ')'], ""));
    }

    s
}

/// Parse a signed amount from a cell or OCR fragment
pub fn parse_amount(raw: &str) -> Option<f64> {
    parse_float_prefix(&clean_amount(raw)).filter(|v| v.is_finite())
}

/// Round to whole paise/cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether a CSV cell looks like an amount (`1,200.00`, `(45)`, `₹ 99 Dr`)
pub fn looks_like_amount(cell: &str) -> bool {
    let cell = cell.trim();
    !cell.is_empty() && cell_amount_regex().is_match(cell)
}

/// Whether a CSV cell looks like a date (`15/01/2024`, `15-Jan-2024`)
pub fn looks_like_date(cell: &str) -> bool {
    let cell = cell.trim();
    !cell.is_empty() && cell_date_regex().is_match(cell)
}

/// Parse a date in any of the common statement formats
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // chrono's %Y accepts 1-4 digits; keep `15/01/24` away from year-first formats
    let year_first = s.len() >= 4 && s.as_bytes()[..4].iter().all(u8::is_ascii_digit);
    for fmt in DATE_FORMATS {
        if fmt.starts_with("%Y") && !year_first {
            continue;
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Date for record `index` of `total` when the statement gave none.
///
/// Counts backward from `today` so the first record gets the earliest date:
/// `today - (total - index)` days.
pub fn synthesized_date(today: NaiveDate, index: usize, total: usize) -> NaiveDate {
    let back = total.saturating_sub(index) as u64;
    today.checked_sub_days(Days::new(back)).unwrap_or(today)
}

/// Truncate a description to `MAX_DESCRIPTION_CHARS` characters
pub fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}
