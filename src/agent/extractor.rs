/// Metadata extraction from natural-language queries
use super::llm::{ChatClient, LlmError};
use super::prompts::METADATA_PROMPT;
use crate::config::ExtractionConfig;
use crate::metadata::{ExtractionError, MetadataQuery, TextField};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

const MAX_ATTEMPTS: usize = 3;

static DECADE_OR_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})s?\b").expect("valid year regex"));

static ARTIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bby\s+([a-z][a-z.'\-]*(?:\s+[a-z][a-z.'\-]*)*?)(?:\s+(?:from|in|with|on|made|during|circa|of)\b|[,;!?]|$)")
        .expect("valid artist regex")
});

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, query: &str) -> Result<MetadataQuery, ExtractionError>;
}

/// Extraction through a chat model
pub struct LlmExtractor {
    client: ChatClient,
}

impl LlmExtractor {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataExtractor for LlmExtractor {
    async fn extract(&self, query: &str) -> Result<MetadataQuery, ExtractionError> {
        let mut last_error = None;

        // Malformed replies are retried; a well-formed reply with bad fields is final
        for attempt in 1..=MAX_ATTEMPTS {
            let content = self
                .client
                .complete(METADATA_PROMPT, query)
                .await
                .map_err(|e: LlmError| ExtractionError::Provider(e.to_string()))?;

            match MetadataQuery::from_json_str(&content) {
                Ok(extracted) => {
                    tracing::debug!(constraints = extracted.len(), attempt, "Extracted metadata");
                    return Ok(extracted);
                }
                Err(ExtractionError::Parse(reason)) => {
                    tracing::debug!(attempt, %reason, "Extraction reply was not JSON");
                    last_error = Some(ExtractionError::Parse(reason));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ExtractionError::Parse("no reply".to_string())))
    }
}

/// Offline extraction from keyword lists and simple patterns
///
/// Recognizes a year or decade, a medium and a support from the configured
/// lists, and `by <name>` for the artist.
pub struct RuleExtractor {
    mediums: Vec<String>,
    supports: Vec<String>,
}

impl RuleExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            mediums: config.mediums.iter().map(|m| m.to_lowercase()).collect(),
            supports: config.supports.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn extract_sync(&self, query: &str) -> MetadataQuery {
        let text = query.to_lowercase();
        let tokens: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut extracted = MetadataQuery::new();

        if let Some(year) = DECADE_OR_YEAR
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            extracted = extracted.with_period(year);
        }

        if let Some(medium) = tokens.iter().find(|t| self.mediums.iter().any(|m| m == *t)) {
            extracted = extracted.with_text(TextField::Medium, *medium);
        }

        if let Some(support) = tokens.iter().find(|t| self.supports.iter().any(|s| s == *t)) {
            extracted = extracted.with_text(TextField::PaperSupport, *support);
        }

        if let Some(artist) = ARTIST.captures(&text).and_then(|c| c.get(1)) {
            extracted = extracted.with_text(TextField::ArtistName, artist.as_str());
        }

        extracted
    }
}

#[async_trait]
impl MetadataExtractor for RuleExtractor {
    async fn extract(&self, query: &str) -> Result<MetadataQuery, ExtractionError> {
        Ok(self.extract_sync(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataConstraint;

    fn rules() -> RuleExtractor {
        RuleExtractor::new(&ExtractionConfig::default())
    }

    #[test]
    fn test_decade_becomes_start_year() {
        let extracted = rules().extract_sync("portraits from the 1950s");
        assert_eq!(extracted.constraints(), &[MetadataConstraint::Period(1950)]);
    }

    #[test]
    fn test_medium_and_support() {
        let extracted = rules().extract_sync("Oil on canvas landscapes");
        assert_eq!(
            extracted,
            MetadataQuery::new()
                .with_text(TextField::Medium, "oil")
                .with_text(TextField::PaperSupport, "canvas")
        );
    }

    #[test]
    fn test_artist_after_by() {
        let extracted = rules().extract_sync("works by Sheela Gowda from 1992");
        assert_eq!(
            extracted,
            MetadataQuery::new()
                .with_period(1992)
                .with_text(TextField::ArtistName, "sheela gowda")
        );
    }

    #[test]
    fn test_artist_at_end_of_query() {
        let extracted = rules().extract_sync("ink drawings by M.F. Husain");
        assert!(extracted.constraints().contains(&MetadataConstraint::Text {
            field: TextField::ArtistName,
            value: "m.f. husain".to_string(),
        }));
    }

    #[test]
    fn test_visual_query_yields_nothing() {
        assert!(rules().extract_sync("horses in a field").is_empty());
    }
}
