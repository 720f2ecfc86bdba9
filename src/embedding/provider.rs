/// Embedding provider trait and CLIP implementation
use super::affinity::{joint_affinity, RankedImage, CLIP_LOGIT_SCALE};
use crate::images::LoadedImage;
use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
///
/// Text and images share one embedding space so that a text query can be
/// compared against indexed image vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate a unit-length embedding for a text
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate unit-length embeddings for several images, in input order
    fn embed_images(&self, images: &[LoadedImage]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Generate a unit-length embedding for a single image
    fn embed_image(&self, image: &LoadedImage) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_images(std::slice::from_ref(image))?
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))
    }

    /// Scale applied to cosine similarity before the batch softmax
    fn logit_scale(&self) -> f32 {
        CLIP_LOGIT_SCALE
    }

    /// Rank a batch of images against one text, most probable first
    ///
    /// Scores form a probability distribution over the batch, so they are
    /// only comparable within one call.
    fn joint_rank(
        &self,
        images: &[LoadedImage],
        text: &str,
    ) -> Result<Vec<RankedImage>, EmbeddingError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let text_vector = self.embed_text(text)?;
        let image_vectors = self.embed_images(images)?;

        if image_vectors.len() != images.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding count mismatch: expected {}, got {}",
                images.len(),
                image_vectors.len()
            )));
        }

        joint_affinity(&image_vectors, &text_vector, self.logit_scale())
    }
}

/// Scale a vector to unit length
pub fn l2_normalize(mut vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbeddingError::GenerationError(
            "Embedding has zero or non-finite norm".to_string(),
        ));
    }

    vector.iter_mut().for_each(|x| *x /= norm);
    Ok(vector)
}

/// CLIP ViT-B/32 provider backed by FastEmbed
///
/// Loads the text and vision towers of the same model so both modalities
/// land in one 512-dimensional space.
pub struct ClipProvider {
    text_model: Arc<TextEmbedding>,
    image_model: Arc<ImageEmbedding>,
    model_name: String,
    dimension: usize,
}

impl ClipProvider {
    /// Create a CLIP provider for the named model
    ///
    /// **Important**: Models are downloaded on first use to the FastEmbed
    /// cache (~600MB for both towers of clip-vit-b-32).
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let (text_model, image_model, dimension) = match model_name {
            "clip-vit-b-32" | "openai/clip-vit-base-patch32" | "Qdrant/clip-ViT-B-32" => (
                EmbeddingModel::ClipVitB32,
                ImageEmbeddingModel::ClipVitB32,
                512,
            ),
            _ => {
                return Err(EmbeddingError::InitializationError(format!(
                    "Unsupported model: {}. Supported: clip-vit-b-32",
                    model_name
                )));
            }
        };

        tracing::info!(
            "Initializing embedding model: {} ({}D, text + image towers)",
            model_name,
            dimension
        );

        let text = TextEmbedding::try_new(
            InitOptions::new(text_model).with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        let image = ImageEmbedding::try_new(
            ImageInitOptions::new(image_model).with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            text_model: Arc::new(text),
            image_model: Arc::new(image),
            model_name: model_name.to_string(),
            dimension,
        })
    }

    /// Create provider with default model (clip-vit-b-32)
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new("clip-vit-b-32")
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), EmbeddingError> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

impl EmbeddingProvider for ClipProvider {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let embedding = self
            .text_model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))?;

        self.check_dimension(&embedding)?;
        l2_normalize(embedding)
    }

    fn embed_images(&self, images: &[LoadedImage]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        // Decoded from bytes so the format comes from content, not the file name
        let bytes: Vec<&[u8]> = images.iter().map(|img| img.bytes.as_ref()).collect();

        let embeddings = self
            .image_model
            .embed_bytes(&bytes, None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        embeddings
            .into_iter()
            .map(|embedding| {
                self.check_dimension(&embedding)?;
                l2_normalize(embedding)
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(vec![3.0, 4.0]).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_rejects_zero_vector() {
        assert!(l2_normalize(vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_unsupported_model() {
        let result = ClipProvider::new("all-MiniLM-L6-v2");
        assert!(matches!(
            result,
            Err(EmbeddingError::InitializationError(_))
        ));
    }

    #[test]
    #[ignore] // Requires model download (~600MB) - run with: cargo test -- --ignored
    fn test_text_embedding_is_unit_length() {
        let provider = ClipProvider::with_default_model().unwrap();
        let embedding = provider.embed_text("a horse in a field").unwrap();

        assert_eq!(embedding.len(), 512);
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    #[ignore] // Requires model download (~600MB) - run with: cargo test -- --ignored
    async fn test_embeds_image_without_extension() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("0123abcd.img");
        image::RgbImage::from_pixel(8, 8, image::Rgb([200, 30, 30]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let loader = crate::images::ImageLoader::new(
            temp.path().join("cache"),
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let image = loader.load(path.to_str().unwrap()).await.unwrap();

        let provider = ClipProvider::with_default_model().unwrap();
        let embedding = provider.embed_image(&image).unwrap();
        assert_eq!(embedding.len(), 512);
    }

    #[test]
    #[ignore] // Requires model download (~600MB) - run with: cargo test -- --ignored
    fn test_empty_text() {
        let provider = ClipProvider::with_default_model().unwrap();
        assert!(provider.embed_text("").is_err());
    }
}
