//! Payload stored alongside each indexed artwork vector

use super::{normalize_period, PeriodRange, TextField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder for absent or blank text fields
pub const UNKNOWN: &str = "unknown";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Trim and lower-case a metadata value, defaulting to [`UNKNOWN`]
pub fn normalize_text(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => unknown(),
    }
}

/// Metadata attached to an indexed artwork
///
/// Text fields are lower-cased at ingestion so that filters can match
/// case-insensitively. `path` keeps its original case since it is used to
/// load the image again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkPayload {
    pub path: String,
    #[serde(default)]
    pub period_start: Option<i64>,
    #[serde(default)]
    pub period_end: Option<i64>,
    #[serde(default = "unknown")]
    pub medium: String,
    #[serde(default = "unknown")]
    pub department: String,
    #[serde(default = "unknown")]
    pub paper_support: String,
    #[serde(default = "unknown")]
    pub artist_name: String,
    /// Other free-text metadata (title, dimensions, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ArtworkPayload {
    /// Payload with only a path; every text field is unknown
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            period_start: None,
            period_end: None,
            medium: unknown(),
            department: unknown(),
            paper_support: unknown(),
            artist_name: unknown(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the period from free text
    pub fn with_period_text(self, text: Option<&str>) -> Self {
        let range = text.map(normalize_period).unwrap_or_default();
        self.with_period(range)
    }

    /// Set the period bounds, ordering them so that start <= end
    pub fn with_period(mut self, range: PeriodRange) -> Self {
        match (range.start, range.end) {
            (Some(start), Some(end)) if start > end => {
                tracing::debug!(start, end, "Swapping reversed period bounds");
                self.period_start = Some(end);
                self.period_end = Some(start);
            }
            (start, end) => {
                self.period_start = start;
                self.period_end = end;
            }
        }
        self
    }

    pub fn with_text(mut self, field: TextField, value: Option<&str>) -> Self {
        *self.text_mut(field) = normalize_text(value);
        self
    }

    /// Attach an extra field; string values are lower-cased
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let value = match value {
            serde_json::Value::String(s) => serde_json::Value::String(normalize_text(Some(&s))),
            other => other,
        };
        self.extra.insert(key.into(), value);
        self
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Medium => &self.medium,
            TextField::Department => &self.department,
            TextField::PaperSupport => &self.paper_support,
            TextField::ArtistName => &self.artist_name,
        }
    }

    fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Medium => &mut self.medium,
            TextField::Department => &mut self.department,
            TextField::PaperSupport => &mut self.paper_support,
            TextField::ArtistName => &mut self.artist_name,
        }
    }

    pub fn period(&self) -> PeriodRange {
        PeriodRange {
            start: self.period_start,
            end: self.period_end,
        }
    }
}
