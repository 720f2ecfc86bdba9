//! Search service combining routing, extraction and the vector index

use super::{rerank_candidates, SearchError, SearchHit, SearchOutcome};
use crate::agent::{MetadataExtractor, QueryRouter, Strategy};
use crate::config::SearchConfig;
use crate::embedding::EmbeddingProvider;
use crate::images::ImageLoader;
use crate::index::{IndexHandle, QueryRequest};
use crate::metadata::build_filter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Artwork searcher
///
/// Holds everything a query needs. Each call runs as one sequential chain:
/// route, embed, query and optionally re-rank.
pub struct ArtSearcher {
    index: Arc<IndexHandle>,
    provider: Arc<dyn EmbeddingProvider>,
    loader: Arc<ImageLoader>,
    extractor: Arc<dyn MetadataExtractor>,
    router: Arc<dyn QueryRouter>,
    config: SearchConfig,
}

impl ArtSearcher {
    pub fn new(
        index: Arc<IndexHandle>,
        provider: Arc<dyn EmbeddingProvider>,
        loader: Arc<ImageLoader>,
        extractor: Arc<dyn MetadataExtractor>,
        router: Arc<dyn QueryRouter>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            provider,
            loader,
            extractor,
            router,
            config,
        }
    }

    /// Route the query, then run the chosen strategy
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let strategy = match self.router.route(query).await {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(error = %e, "Routing failed; falling back to feature search");
                Strategy::Feature
            }
        };

        info!(strategy = %strategy, "Routed query");
        self.search_with(strategy, query).await
    }

    /// Run a specific strategy; failures become an empty outcome
    pub async fn search_with(&self, strategy: Strategy, query: &str) -> SearchOutcome {
        let result = match strategy {
            Strategy::Feature => self.search_by_feature(query).await,
            Strategy::Metadata => self.search_by_metadata(query).await,
            Strategy::Hybrid => self.hybrid_search(query).await,
            Strategy::Random => Ok(Vec::new()),
        };

        match result {
            Ok(hits) => {
                debug!(strategy = %strategy, hits = hits.len(), "Search complete");
                SearchOutcome::success(strategy, hits)
            }
            Err(e) => {
                let kind = e.kind();
                if kind.is_operational() {
                    error!(strategy = %strategy, kind = %kind, error = %e, "Search failed");
                } else {
                    warn!(strategy = %strategy, kind = %kind, error = %e, "Search failed");
                }
                SearchOutcome::failed(strategy, kind)
            }
        }
    }

    /// Text embedding against image embeddings, no metadata filter
    pub async fn search_by_feature(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let vector = self.provider.embed_text(query)?;

        let request = QueryRequest::new(vector, self.config.feature_limit)
            .with_score_threshold(self.config.feature_threshold);

        self.run(&request).await
    }

    /// Image embedding against image embeddings
    pub async fn search_by_image(&self, source: &str) -> Result<Vec<SearchHit>, SearchError> {
        let image = self.loader.load(source).await?;
        let vector = self.provider.embed_image(&image)?;

        let request = QueryRequest::new(vector, self.config.image_limit)
            .with_score_threshold(self.config.image_threshold);

        self.run(&request).await
    }

    /// Extract metadata constraints and search within the matching artworks
    pub async fn search_by_metadata(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let extracted = self.extractor.extract(query).await?;
        if extracted.is_empty() {
            debug!("No metadata constraints extracted; searching unfiltered");
        }

        let filter = build_filter(&extracted);
        let vector = self.provider.embed_text(query)?;

        let request =
            QueryRequest::new(vector, self.config.metadata_limit).with_filter(filter);

        self.run(&request).await
    }

    /// Metadata search re-ranked by joint image/text affinity
    pub async fn hybrid_search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let candidates = self.search_by_metadata(query).await?;
        debug!(candidates = candidates.len(), "Re-ranking metadata candidates");

        let ranked =
            rerank_candidates(candidates, query, &self.loader, self.provider.as_ref()).await?;
        Ok(ranked)
    }

    async fn run(&self, request: &QueryRequest) -> Result<Vec<SearchHit>, SearchError> {
        let hits = self.index.query(request).await?;
        Ok(hits.into_iter().map(SearchHit::from).collect())
    }
}
