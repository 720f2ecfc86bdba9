//! Typed metadata constraints produced by the extraction step

use super::{extract_years, TextField, PERIOD_KEY};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction output is not well-formed: {0}")]
    Parse(String),

    #[error("Unrecognized metadata field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Extraction provider failed: {0}")]
    Provider(String),
}

/// A single recognized metadata constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataConstraint {
    /// Artwork period must strictly bracket this year
    Period(i64),
    /// Text field must contain this value (case-insensitive)
    Text { field: TextField, value: String },
}

/// Ordered set of constraints extracted from one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataQuery {
    constraints: Vec<MetadataConstraint>,
}

impl MetadataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_period(mut self, year: i64) -> Self {
        self.constraints.push(MetadataConstraint::Period(year));
        self
    }

    pub fn with_text(mut self, field: TextField, value: impl Into<String>) -> Self {
        self.constraints.push(MetadataConstraint::Text {
            field,
            value: value.into().trim().to_lowercase(),
        });
        self
    }

    pub fn constraints(&self) -> &[MetadataConstraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Parse extraction output text, which must hold a JSON object
    pub fn from_json_str(text: &str) -> Result<Self, ExtractionError> {
        let value: Value = serde_json::from_str(strip_code_fence(text))
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Build a query from an extraction JSON object
    ///
    /// Keys outside the recognized field set are rejected. Null or blank
    /// values carry no constraint and are skipped. Constraints keep the
    /// order of the object's keys.
    pub fn from_json(value: &Value) -> Result<Self, ExtractionError> {
        let object = value
            .as_object()
            .ok_or_else(|| ExtractionError::Parse("expected a JSON object".to_string()))?;

        let mut query = Self::new();

        for (key, raw) in object {
            let Some(text) = value_as_text(key, raw)? else {
                tracing::debug!(field = %key, "Skipping empty metadata value");
                continue;
            };

            if key == PERIOD_KEY {
                query = query.with_period(parse_period_year(&text)?);
                continue;
            }

            let field = TextField::from_key(key)
                .ok_or_else(|| ExtractionError::UnknownField(key.clone()))?;
            query = query.with_text(field, text);
        }

        Ok(query)
    }
}

fn value_as_text(key: &str, raw: &Value) -> Result<Option<String>, ExtractionError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(ExtractionError::InvalidValue {
            field: key.to_string(),
            reason: format!("expected a string or number, got {}", other),
        }),
    }
}

/// A period value names one year: the first one mentioned
///
/// Interval words are ignored, so "Before 1900" and "1900-1950" both give
/// 1900 rather than an interval bound.
fn parse_period_year(text: &str) -> Result<i64, ExtractionError> {
    extract_years(text)
        .first()
        .copied()
        .ok_or_else(|| ExtractionError::InvalidValue {
            field: PERIOD_KEY.to_string(),
            reason: format!("no year in '{}'", text),
        })
}

/// LLMs sometimes wrap JSON in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_recognized_fields() {
        let query =
            MetadataQuery::from_json_str(r#"{"medium": "Oil", "period": "1950"}"#).unwrap();

        assert_eq!(
            query.constraints(),
            &[
                MetadataConstraint::Text {
                    field: TextField::Medium,
                    value: "oil".to_string()
                },
                MetadataConstraint::Period(1950),
            ]
        );
    }

    #[test]
    fn test_period_accepts_numbers_and_decades() {
        let query = MetadataQuery::from_json(&serde_json::json!({"period": 1992})).unwrap();
        assert_eq!(query.constraints(), &[MetadataConstraint::Period(1992)]);

        let query = MetadataQuery::from_json(&serde_json::json!({"period": "1950s"})).unwrap();
        assert_eq!(query.constraints(), &[MetadataConstraint::Period(1950)]);
    }

    #[test]
    fn test_period_with_interval_word_uses_its_year() {
        let query = MetadataQuery::from_json_str(r#"{"period": "Before 1900"}"#).unwrap();
        assert_eq!(query.constraints(), &[MetadataConstraint::Period(1900)]);

        let query = MetadataQuery::from_json_str(r#"{"period": "After 2000"}"#).unwrap();
        assert_eq!(query.constraints(), &[MetadataConstraint::Period(2000)]);

        let filter = crate::metadata::build_filter(
            &MetadataQuery::from_json_str(r#"{"period": "Before 1900"}"#).unwrap(),
        );
        let artwork = crate::metadata::ArtworkPayload::new("a.png")
            .with_period(crate::metadata::PeriodRange::new(1850, 1950));
        assert!(filter.matches(&artwork));
    }

    #[test]
    fn test_constraints_keep_reply_order() {
        let query =
            MetadataQuery::from_json_str(r#"{"period": "1950", "artist_name": "Monet"}"#).unwrap();

        assert_eq!(
            query.constraints(),
            &[
                MetadataConstraint::Period(1950),
                MetadataConstraint::Text {
                    field: TextField::ArtistName,
                    value: "monet".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = MetadataQuery::from_json_str(r#"{"title": "Horses"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownField(key) if key == "title"));
    }

    #[test]
    fn test_rejects_malformed_output() {
        assert!(matches!(
            MetadataQuery::from_json_str("medium: oil"),
            Err(ExtractionError::Parse(_))
        ));
        assert!(matches!(
            MetadataQuery::from_json_str(r#"["oil"]"#),
            Err(ExtractionError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_period_without_year() {
        let err = MetadataQuery::from_json_str(r#"{"period": "renaissance"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidValue { .. }));
    }

    #[test]
    fn test_skips_null_and_blank_values() {
        let query =
            MetadataQuery::from_json_str(r#"{"medium": null, "artist_name": "  "}"#).unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn test_strips_markdown_fence() {
        let query =
            MetadataQuery::from_json_str("```json\n{\"paper_support\": \"Canvas\"}\n```").unwrap();
        assert_eq!(query.len(), 1);
    }
}
