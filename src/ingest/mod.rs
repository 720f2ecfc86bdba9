//! Catalog ingestion: load images, embed them and upsert into the index
mod catalog;

pub use catalog::{catalog_from_file, catalog_from_folder, CatalogEntry, IMAGE_EXTENSIONS};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::images::{ImageLoader, LoadedImage};
use crate::index::{ArtworkRecord, IndexHandle};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of an ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub indexed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Batch ingestion of catalog entries into the artwork index
///
/// Entries whose image cannot be loaded or embedded are logged and skipped;
/// only index failures abort the pass.
pub struct Ingestor {
    index: Arc<IndexHandle>,
    provider: Arc<dyn EmbeddingProvider>,
    loader: Arc<ImageLoader>,
    batch_size: usize,
}

impl Ingestor {
    /// Create a new ingestor
    ///
    /// # Arguments
    /// * `index` - Target collection
    /// * `provider` - Image embedding provider
    /// * `loader` - Image loader for paths and URLs
    /// * `batch_size` - Number of images embedded and upserted together
    pub fn new(
        index: Arc<IndexHandle>,
        provider: Arc<dyn EmbeddingProvider>,
        loader: Arc<ImageLoader>,
        batch_size: usize,
    ) -> Self {
        Self {
            index,
            provider,
            loader,
            batch_size: batch_size.max(1),
        }
    }

    /// Recreate the collection, then ingest every entry
    pub async fn rebuild(&self, entries: Vec<CatalogEntry>) -> Result<IngestReport> {
        info!("Recreating collection before ingestion");
        self.index.recreate().await?;
        self.ingest(entries).await
    }

    /// Ingest entries into the existing collection
    ///
    /// Entries without an explicit id take their position in `entries`.
    pub async fn ingest(&self, entries: Vec<CatalogEntry>) -> Result<IngestReport> {
        let start = std::time::Instant::now();
        let total = entries.len();

        info!("Starting ingestion of {} catalog entries", total);
        self.index.create_if_absent().await?;

        let mut indexed = 0;
        let mut skipped = 0;

        let entries: Vec<(u64, CatalogEntry)> = entries
            .into_iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.unwrap_or(position as u64), entry))
            .collect();

        for chunk in entries.chunks(self.batch_size) {
            let records = self.embed_chunk(chunk).await;
            skipped += chunk.len() - records.len();

            let count = records.len();
            self.index.upsert(records).await?;
            indexed += count;
            debug!("Indexed chunk of {} artworks", count);
        }

        self.index.flush().await?;
        if indexed > 0 {
            self.index.mark_ready();
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Ingestion complete: {} indexed, {} skipped, {}ms",
            indexed, skipped, duration_ms
        );

        Ok(IngestReport {
            indexed,
            skipped,
            duration_ms,
        })
    }

    /// Load and embed one chunk, dropping entries that fail
    async fn embed_chunk(&self, chunk: &[(u64, CatalogEntry)]) -> Vec<ArtworkRecord> {
        let sources: Vec<&str> = chunk.iter().map(|(_, entry)| entry.path.as_str()).collect();
        let loaded = self.loader.load_all(&sources).await;
        if loaded.is_empty() {
            return Vec::new();
        }

        let images: Vec<LoadedImage> = loaded.iter().map(|(_, image)| image.clone()).collect();
        let vectors = self.embed_images(&images);

        loaded
            .into_iter()
            .zip(vectors)
            .filter_map(|((position, _), vector)| {
                let (id, entry) = &chunk[position];
                vector.map(|vector| ArtworkRecord {
                    id: *id,
                    vector,
                    payload: entry.to_payload(),
                })
            })
            .collect()
    }

    /// Embed a batch; if the batch call fails, retry one image at a time so a
    /// single bad image only costs itself
    fn embed_images(&self, images: &[LoadedImage]) -> Vec<Option<Vec<f32>>> {
        match self.provider.embed_images(images) {
            Ok(vectors) if vectors.len() == images.len() => {
                return vectors.into_iter().map(Some).collect();
            }
            Ok(vectors) => warn!(
                "Embedding count mismatch: expected {}, got {}; retrying individually",
                images.len(),
                vectors.len()
            ),
            Err(e) => warn!(error = %e, "Batch embedding failed; retrying individually"),
        }

        images
            .iter()
            .map(|image| match self.provider.embed_image(image) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!(source = %image.source, error = %e, "Skipping image that failed to embed");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{l2_normalize, EmbeddingError};
    use crate::index::{MemoryStore, QueryRequest};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Embeds an image as its first pixel's colour
    struct PixelEmbedder;

    impl EmbeddingProvider for PixelEmbedder {
        fn embed_text(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            l2_normalize(vec![1.0, 0.0, 0.0])
        }

        fn embed_images(
            &self,
            images: &[LoadedImage],
        ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            images
                .iter()
                .map(|img| {
                    let rgb = image::load_from_memory(&img.bytes)
                        .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?
                        .to_rgb8();
                    let p = rgb.get_pixel(0, 0);
                    l2_normalize(vec![p[0] as f32, p[1] as f32, p[2] as f32])
                })
                .collect()
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "pixel"
        }
    }

    fn write_png(dir: &std::path::Path, name: &str, rgb: [u8; 3]) -> String {
        let path = dir.join(name);
        image::RgbImage::from_pixel(2, 2, image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path.display().to_string()
    }

    fn ingestor(temp: &TempDir, batch_size: usize) -> (Ingestor, Arc<IndexHandle>) {
        let index = Arc::new(IndexHandle::new(Arc::new(MemoryStore::new()), 3));
        let loader = Arc::new(
            ImageLoader::new(temp.path().join("cache"), Duration::from_secs(5)).unwrap(),
        );
        let ingestor = Ingestor::new(index.clone(), Arc::new(PixelEmbedder), loader, batch_size);
        (ingestor, index)
    }

    #[tokio::test]
    async fn test_ingest_indexes_every_decodable_image() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = ingestor(&temp, 2);

        let entries = vec![
            CatalogEntry::new(write_png(temp.path(), "red.png", [255, 0, 0])),
            CatalogEntry::new(write_png(temp.path(), "green.png", [0, 255, 0])),
            CatalogEntry::new(write_png(temp.path(), "blue.png", [0, 0, 255])),
        ];

        let report = ingestor.ingest(entries).await.unwrap();
        assert_eq!(report.indexed, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(index.count().await.unwrap(), 3);
        assert!(index.is_ready());

        let hits = index
            .query(&QueryRequest::new(vec![0.0, 1.0, 0.0], 1))
            .await
            .unwrap();
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].payload.path.ends_with("green.png"));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = ingestor(&temp, 8);

        let broken = temp.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();

        let entries = vec![
            CatalogEntry::new(write_png(temp.path(), "a.png", [10, 20, 30])),
            CatalogEntry::new(broken.display().to_string()),
            CatalogEntry::new(write_png(temp.path(), "b.png", [30, 20, 10])),
        ];

        let report = ingestor.ingest(entries).await.unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_collection() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = ingestor(&temp, 4);

        let first = vec![
            CatalogEntry::new(write_png(temp.path(), "a.png", [1, 2, 3])),
            CatalogEntry::new(write_png(temp.path(), "b.png", [3, 2, 1])),
        ];
        ingestor.ingest(first).await.unwrap();

        let second = vec![CatalogEntry::new(write_png(temp.path(), "c.png", [9, 9, 9]))];
        let report = ingestor.rebuild(second).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog_leaves_index_not_ready() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = ingestor(&temp, 4);

        let report = ingestor.ingest(Vec::new()).await.unwrap();
        assert_eq!(report, IngestReport { duration_ms: report.duration_ms, ..Default::default() });
        assert!(!index.is_ready());
    }
}
