//! Wiring of configured components
//!
//! Builds the index, loader, extractor and router a command needs from a
//! [`Config`]. The embedding model is left to the caller since loading it is
//! slow and only some commands need it.

use crate::agent::{
    ChatClient, KeywordRouter, LlmExtractor, LlmRouter, MetadataExtractor, QueryRouter,
    RuleExtractor,
};
use crate::config::{expand_tilde, Config};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, ScoutError};
use crate::images::ImageLoader;
use crate::index::{IndexHandle, MemoryStore, QdrantStore, VectorStore};
use crate::retrieval::ArtSearcher;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the configured vector store backend
pub fn open_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    match config.index.backend.as_str() {
        "memory" if config.index.persist => {
            Ok(Arc::new(MemoryStore::open(config.snapshot_path())?))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "qdrant" => Ok(Arc::new(QdrantStore::new(
            &config.index.qdrant_url,
            &config.index.collection,
            config.index.timeout(),
        )?)),
        other => Err(ScoutError::InvalidConfigValue {
            path: "index.backend".to_string(),
            message: format!("Unknown backend '{}'", other),
        }),
    }
}

/// Open the index handle, creating the collection if needed
pub async fn open_index(config: &Config) -> Result<Arc<IndexHandle>> {
    let store = open_store(config)?;
    let handle = IndexHandle::open(store, config.index.vector_dim).await?;
    Ok(Arc::new(handle))
}

pub fn image_loader(config: &Config) -> Result<Arc<ImageLoader>> {
    let loader = ImageLoader::new(
        expand_tilde(&config.storage.image_cache_dir),
        config.loader.timeout(),
    )?;
    Ok(Arc::new(loader))
}

/// Chat client when the LLM is enabled and its key is available
fn chat_client(config: &Config) -> Option<ChatClient> {
    if !config.llm.enabled {
        return None;
    }

    match ChatClient::new(&config.llm) {
        Ok(client) => {
            info!(model = client.model(), "Using LLM for extraction and routing");
            Some(client)
        }
        Err(e) => {
            warn!(error = %e, "LLM unavailable; using keyword rules");
            None
        }
    }
}

pub fn extractor(config: &Config) -> Arc<dyn MetadataExtractor> {
    match chat_client(config) {
        Some(client) => Arc::new(LlmExtractor::new(client)),
        None => Arc::new(RuleExtractor::new(&config.extraction)),
    }
}

pub fn router(config: &Config) -> Arc<dyn QueryRouter> {
    match chat_client(config) {
        Some(client) => Arc::new(LlmRouter::new(client)),
        None => Arc::new(KeywordRouter::new(&config.extraction)),
    }
}

/// Assemble a searcher around an already-open index and embedding provider
pub fn searcher(
    config: &Config,
    index: Arc<IndexHandle>,
    provider: Arc<dyn EmbeddingProvider>,
) -> Result<ArtSearcher> {
    Ok(ArtSearcher::new(
        index,
        provider,
        image_loader(config)?,
        extractor(config),
        router(config),
        config.search.clone(),
    ))
}
