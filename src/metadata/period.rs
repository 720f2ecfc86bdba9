//! Free-text period parsing
//!
//! Turns catalog period strings ("1851-1900", "After 2000", "c. 1992",
//! "1950; 1980") into a closed year interval.

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("year pattern is a valid regex"));

/// Closed year interval, or an empty pair when no year was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl PeriodRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "{}-{}", start, end),
            _ => write!(f, "unknown"),
        }
    }
}

/// Parse a period expression using the current calendar year for "after" ranges
pub fn normalize_period(text: &str) -> PeriodRange {
    normalize_period_at(text, chrono::Utc::now().year() as i64)
}

/// Parse a period expression against an explicit current year
///
/// Rules are applied in order and the first match wins:
/// 1. "after" with a year: `[first, current_year]`
/// 2. "before" with a year: `[0, first]`
/// 3. `;` or `,` with two or more years: `[min, max]`
/// 4. exactly two years: `[first, second]` in the order they appear
/// 5. exactly one year: `[year, year]`
///
/// Anything else (including three or more bare years) is unknown.
pub fn normalize_period_at(text: &str, current_year: i64) -> PeriodRange {
    let text = text.trim().to_lowercase();
    let years = extract_years(&text);

    let Some(&first) = years.first() else {
        return PeriodRange::unknown();
    };

    if contains_word(&text, "after") {
        return PeriodRange::new(first, current_year);
    }

    if contains_word(&text, "before") {
        return PeriodRange::new(0, first);
    }

    if (text.contains(';') || text.contains(',')) && years.len() >= 2 {
        // Both bounds exist because years is non-empty
        let min = years.iter().copied().min().unwrap_or(first);
        let max = years.iter().copied().max().unwrap_or(first);
        return PeriodRange::new(min, max);
    }

    match years.as_slice() {
        [start, end] => PeriodRange::new(*start, *end),
        [year] => PeriodRange::new(*year, *year),
        _ => PeriodRange::unknown(),
    }
}

/// All 4-digit runs in order of appearance
pub fn extract_years(text: &str) -> Vec<i64> {
    YEAR_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}
