/// Joint image/text re-ranking of candidate hits
use super::SearchHit;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::images::{ImageLoader, LoadedImage};
use tracing::{debug, warn};

/// Re-order candidates by how well each image matches `text`
///
/// Every candidate image is loaded; ones that fail are dropped. When none
/// load, the candidates come back unchanged. Otherwise the loaded candidates
/// are returned most probable first, each score replaced by its share of the
/// batch softmax.
pub async fn rerank_candidates(
    candidates: Vec<SearchHit>,
    text: &str,
    loader: &ImageLoader,
    provider: &dyn EmbeddingProvider,
) -> Result<Vec<SearchHit>, EmbeddingError> {
    if candidates.is_empty() {
        return Ok(candidates);
    }

    let paths: Vec<&str> = candidates.iter().map(|hit| hit.path.as_str()).collect();
    let loaded = loader.load_all(&paths).await;

    if loaded.is_empty() {
        warn!(
            candidates = candidates.len(),
            "No candidate image could be loaded; keeping metadata order"
        );
        return Ok(candidates);
    }

    if loaded.len() < candidates.len() {
        debug!(
            dropped = candidates.len() - loaded.len(),
            "Dropping candidates whose images failed to load"
        );
    }

    let images: Vec<LoadedImage> = loaded.iter().map(|(_, image)| image.clone()).collect();
    let ranked = provider.joint_rank(&images, text)?;

    let mut slots: Vec<Option<SearchHit>> = candidates.into_iter().map(Some).collect();

    Ok(ranked
        .into_iter()
        .filter_map(|rank| {
            let (position, _) = loaded[rank.index];
            slots[position].take().map(|mut hit| {
                hit.score = rank.probability;
                hit
            })
        })
        .collect())
}
