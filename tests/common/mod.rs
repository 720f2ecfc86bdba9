//! Shared fixtures for integration tests
#![allow(dead_code)]

use artscout::embedding::{l2_normalize, EmbeddingError, EmbeddingProvider};
use artscout::images::{ImageLoader, LoadedImage};
use std::path::Path;
use std::time::Duration;

/// Deterministic 3-D embedder
///
/// Images embed to their first pixel's colour. Text embeds to the colour
/// words it mentions, or to grey when it names none.
pub struct ColorEmbedder;

impl EmbeddingProvider for ColorEmbedder {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let text = text.to_lowercase();
        let mut vector = vec![0.0_f32; 3];
        for (word, axis) in [("red", 0), ("green", 1), ("blue", 2)] {
            if text.contains(word) {
                vector[axis] = 1.0;
            }
        }
        if vector.iter().all(|v| *v == 0.0) {
            vector = vec![1.0, 1.0, 1.0];
        }
        l2_normalize(vector)
    }

    fn embed_images(&self, images: &[LoadedImage]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        images
            .iter()
            .map(|img| {
                let rgb = image::load_from_memory(&img.bytes)
                    .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?
                    .to_rgb8();
                let p = rgb.get_pixel(0, 0);
                l2_normalize(vec![
                    p[0] as f32 + 1.0,
                    p[1] as f32 + 1.0,
                    p[2] as f32 + 1.0,
                ])
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "color-stub"
    }
}

/// Write a solid-colour PNG and return its path
pub fn write_png(dir: &Path, name: &str, rgb: [u8; 3]) -> String {
    let path = dir.join(name);
    image::RgbImage::from_pixel(4, 4, image::Rgb(rgb))
        .save(&path)
        .unwrap();
    path.display().to_string()
}

pub fn loader(dir: &Path) -> ImageLoader {
    ImageLoader::new(dir.join("cache"), Duration::from_secs(5)).unwrap()
}
