/// Query routing: pick a search strategy for a query
use super::llm::ChatClient;
use super::prompts::ROUTER_PROMPT;
use crate::config::ExtractionConfig;
use ahash::AHashSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Routing provider failed: {0}")]
    Provider(String),

    #[error("Unrecognized tool selection: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Text embedding against image embeddings
    Feature,
    /// Metadata filter plus text embedding
    Metadata,
    /// Metadata candidates re-ranked by joint affinity
    Hybrid,
    /// Nonsense query; returns nothing
    Random,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Feature,
        Strategy::Metadata,
        Strategy::Hybrid,
        Strategy::Random,
    ];

    pub fn tool_name(&self) -> &'static str {
        match self {
            Strategy::Feature => "search_by_feature",
            Strategy::Metadata => "search_by_metadata",
            Strategy::Hybrid => "search_hybrid",
            Strategy::Random => "random_search",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Feature => "feature",
            Strategy::Metadata => "metadata",
            Strategy::Hybrid => "hybrid",
            Strategy::Random => "random",
        }
    }

    /// Parse a model's tool selection
    ///
    /// Accepts tool names and bare strategy names, with surrounding quotes,
    /// backticks or prose tolerated as long as exactly one tool is named.
    pub fn from_tool_name(reply: &str) -> Option<Self> {
        let cleaned = reply
            .trim()
            .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
            .to_lowercase();

        if let Some(strategy) = Self::ALL
            .into_iter()
            .find(|s| cleaned == s.tool_name() || cleaned == s.as_str())
        {
            return Some(strategy);
        }

        let mentioned: Vec<Strategy> = Self::ALL
            .into_iter()
            .filter(|s| cleaned.contains(s.tool_name()))
            .collect();

        match mentioned.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tool_name(s).ok_or_else(|| RouteError::UnknownTool(s.to_string()))
    }
}

#[async_trait]
pub trait QueryRouter: Send + Sync {
    async fn route(&self, query: &str) -> Result<Strategy, RouteError>;
}

/// Routing through a chat model acting as tool selector
pub struct LlmRouter {
    client: ChatClient,
}

impl LlmRouter {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryRouter for LlmRouter {
    async fn route(&self, query: &str) -> Result<Strategy, RouteError> {
        let reply = self
            .client
            .complete(ROUTER_PROMPT, query)
            .await
            .map_err(|e| RouteError::Provider(e.to_string()))?;

        Strategy::from_tool_name(&reply).ok_or(RouteError::UnknownTool(reply))
    }
}

/// Offline routing by keyword lists
pub struct KeywordRouter {
    metadata: AHashSet<String>,
    visual: AHashSet<String>,
}

impl KeywordRouter {
    pub fn new(config: &ExtractionConfig) -> Self {
        let lower = |words: &[String]| -> AHashSet<String> {
            words.iter().map(|w| w.to_lowercase()).collect()
        };
        Self {
            metadata: lower(&config.metadata_keywords),
            visual: lower(&config.visual_keywords),
        }
    }

    pub fn classify(&self, query: &str) -> Strategy {
        let text = query.to_lowercase();
        let tokens: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let has_year = tokens.iter().any(|t| is_year_token(t));
        let has_word = tokens
            .iter()
            .any(|t| t.chars().filter(|c| c.is_alphabetic()).count() >= 3);

        if !has_word && !has_year {
            return Strategy::Random;
        }

        let metadata = has_year || tokens.iter().any(|t| self.metadata.contains(*t));
        let visual = tokens.iter().any(|t| self.visual.contains(*t));

        match (metadata, visual) {
            (true, true) => Strategy::Hybrid,
            (true, false) => Strategy::Metadata,
            _ => Strategy::Feature,
        }
    }
}

/// "1992" or "1950s"
fn is_year_token(token: &str) -> bool {
    let digits = token.strip_suffix('s').unwrap_or(token);
    digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit())
}

#[async_trait]
impl QueryRouter for KeywordRouter {
    async fn route(&self, query: &str) -> Result<Strategy, RouteError> {
        Ok(self.classify(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        assert_eq!(Strategy::from_tool_name("search_hybrid"), Some(Strategy::Hybrid));
        assert_eq!(
            Strategy::from_tool_name("`search_by_metadata`"),
            Some(Strategy::Metadata)
        );
        assert_eq!(Strategy::from_tool_name(" Feature\n"), Some(Strategy::Feature));
        assert_eq!(
            Strategy::from_tool_name("I would use random_search here."),
            Some(Strategy::Random)
        );
    }

    #[test]
    fn test_ambiguous_reply_is_rejected() {
        assert_eq!(
            Strategy::from_tool_name("search_by_feature or search_hybrid"),
            None
        );
        assert!("painting".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_keyword_routing() {
        let router = KeywordRouter::new(&ExtractionConfig::default());

        assert_eq!(router.classify("paintings with blue backgrounds"), Strategy::Feature);
        assert_eq!(router.classify("artworks from 1992"), Strategy::Metadata);
        assert_eq!(router.classify("stencil mounted on white board"), Strategy::Hybrid);
        assert_eq!(
            router.classify("works by Sheela Gowda with a red background"),
            Strategy::Hybrid
        );
        assert_eq!(router.classify("fragile stencil mounted on board"), Strategy::Metadata);
        assert_eq!(router.classify("?? 12 !"), Strategy::Random);
        assert_eq!(router.classify("rural life"), Strategy::Feature);
    }

    #[tokio::test]
    async fn test_keyword_router_never_fails() {
        let router = KeywordRouter::new(&ExtractionConfig::default());
        assert_eq!(router.route("").await.unwrap(), Strategy::Random);
    }
}
