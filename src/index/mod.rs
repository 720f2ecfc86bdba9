//! Vector index with metadata-filtered similarity search
//!
//! [`IndexHandle`] is passed explicitly to whoever needs the index. It owns a
//! [`VectorStore`] backend and tracks whether the collection has been built,
//! so readiness is a property callers can ask about rather than global state.

mod memory;
mod qdrant;

pub use memory::{cosine_similarity, MemoryStore};
pub use qdrant::QdrantStore;

use crate::metadata::{ArtworkPayload, MetadataFilter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Vector index unavailable: {0}")]
    Unavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// One indexed artwork
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ArtworkPayload,
}

/// Nearest-neighbour query, optionally narrowed by a metadata filter
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub filter: Option<MetadataFilter>,
    pub limit: usize,
    pub score_threshold: Option<f32>,
}

impl QueryRequest {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            filter: None,
            limit,
            score_threshold: None,
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }
}

/// A search hit: cosine score (higher is more similar) and the stored payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArtwork {
    pub id: u64,
    pub score: f32,
    pub payload: ArtworkPayload,
}

/// Storage backend for artwork vectors
///
/// Implementations return results sorted by descending score, apply the
/// filter before ranking and never return more than `limit` hits.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection unless it already exists
    async fn create_if_absent(&self, dimension: usize) -> Result<(), IndexError>;

    /// Drop every record and recreate the collection
    async fn recreate(&self, dimension: usize) -> Result<(), IndexError>;

    /// Insert records, replacing any with the same id
    async fn upsert(&self, records: Vec<ArtworkRecord>) -> Result<(), IndexError>;

    async fn query(&self, request: &QueryRequest) -> Result<Vec<ScoredArtwork>, IndexError>;

    async fn count(&self) -> Result<u64, IndexError>;

    /// Persist pending state, if the backend keeps any
    async fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str;
}

/// Shared handle to the artwork collection
pub struct IndexHandle {
    store: Arc<dyn VectorStore>,
    dimension: usize,
    ready: AtomicBool,
}

impl IndexHandle {
    pub fn new(store: Arc<dyn VectorStore>, dimension: usize) -> Self {
        Self {
            store,
            dimension,
            ready: AtomicBool::new(false),
        }
    }

    /// Ensure the collection exists; a non-empty collection counts as ready
    pub async fn open(store: Arc<dyn VectorStore>, dimension: usize) -> Result<Self, IndexError> {
        let handle = Self::new(store, dimension);
        handle.store.create_if_absent(dimension).await?;

        let count = handle.store.count().await?;
        if count > 0 {
            handle.mark_ready();
        }

        tracing::info!(
            backend = handle.store.backend_name(),
            dimension,
            count,
            "Vector index opened"
        );

        Ok(handle)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Whether a full ingestion pass has completed
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub async fn create_if_absent(&self) -> Result<(), IndexError> {
        self.store.create_if_absent(self.dimension).await
    }

    /// Full replace: the handle is not ready until the next ingestion completes
    pub async fn recreate(&self) -> Result<(), IndexError> {
        self.ready.store(false, Ordering::Release);
        self.store.recreate(self.dimension).await
    }

    pub async fn upsert(&self, records: Vec<ArtworkRecord>) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            self.check_dimension(record.vector.len())?;
        }
        self.store.upsert(records).await
    }

    /// Filtered similarity search
    ///
    /// An empty index or a filter nothing satisfies yields `Ok(vec![])`.
    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<ScoredArtwork>, IndexError> {
        self.check_dimension(request.vector.len())?;

        if request.limit == 0 {
            return Ok(Vec::new());
        }

        if !self.is_ready() {
            tracing::debug!("Querying an index that has not finished building");
        }

        self.store.query(request).await
    }

    pub async fn count(&self) -> Result<u64, IndexError> {
        self.store.count().await
    }

    pub async fn flush(&self) -> Result<(), IndexError> {
        self.store.flush().await
    }

    fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}
