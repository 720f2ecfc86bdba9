//! Artwork retrieval: strategy dispatch, filtered search and hybrid re-ranking

mod rerank;
mod searcher;

pub use rerank::rerank_candidates;
pub use searcher::ArtSearcher;

use crate::agent::Strategy;
use crate::embedding::EmbeddingError;
use crate::images::ImageError;
use crate::index::{IndexError, ScoredArtwork};
use crate::metadata::{ArtworkPayload, ExtractionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl SearchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SearchError::Embedding(EmbeddingError::DimensionMismatch { .. })
            | SearchError::Index(IndexError::DimensionMismatch { .. }) => {
                FailureKind::DimensionMismatch
            }
            SearchError::Embedding(_) => FailureKind::EmbeddingFailure,
            SearchError::Index(_) => FailureKind::IndexUnavailable,
            SearchError::Image(_) => FailureKind::ImageDecodeFailure,
            SearchError::Extraction(_) => FailureKind::ExtractionParseFailure,
        }
    }
}

/// Why a strategy produced no results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EmbeddingFailure,
    IndexUnavailable,
    ImageDecodeFailure,
    ExtractionParseFailure,
    DimensionMismatch,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::EmbeddingFailure => "embedding_failure",
            FailureKind::IndexUnavailable => "index_unavailable",
            FailureKind::ImageDecodeFailure => "image_decode_failure",
            FailureKind::ExtractionParseFailure => "extraction_parse_failure",
            FailureKind::DimensionMismatch => "dimension_mismatch",
        }
    }

    /// Failures that point at a broken deployment rather than a bad query
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            FailureKind::IndexUnavailable | FailureKind::DimensionMismatch
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub path: String,
    /// Cosine similarity, or joint-affinity probability after a hybrid re-rank
    pub score: f32,
    pub payload: ArtworkPayload,
}

impl From<ScoredArtwork> for SearchHit {
    fn from(scored: ScoredArtwork) -> Self {
        Self {
            id: scored.id,
            path: scored.payload.path.clone(),
            score: scored.score,
            payload: scored.payload,
        }
    }
}

/// Result of running one strategy
///
/// Failures never escape as errors: the hit list is empty and `failure`
/// says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub strategy: Strategy,
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl SearchOutcome {
    pub fn success(strategy: Strategy, hits: Vec<SearchHit>) -> Self {
        Self {
            strategy,
            hits,
            failure: None,
        }
    }

    pub fn failed(strategy: Strategy, kind: FailureKind) -> Self {
        Self {
            strategy,
            hits: Vec::new(),
            failure: Some(kind),
        }
    }
}
