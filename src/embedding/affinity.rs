//! Joint image-given-text affinity over a candidate batch
//!
//! Mirrors how CLIP scores one caption against several images: scaled cosine
//! logits followed by a softmax across the images.

use super::EmbeddingError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// CLIP's learned temperature (exp of the logit scale parameter)
pub const CLIP_LOGIT_SCALE: f32 = 100.0;

/// Position of an image in the input batch with its share of probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedImage {
    pub index: usize,
    pub probability: f32,
}

/// Rank image vectors against a text vector
///
/// Returns one entry per image, sorted by descending probability. Equal
/// probabilities keep their input order.
pub fn joint_affinity(
    image_vectors: &[Vec<f32>],
    text_vector: &[f32],
    logit_scale: f32,
) -> Result<Vec<RankedImage>, EmbeddingError> {
    if image_vectors.is_empty() {
        return Ok(Vec::new());
    }

    let dim = text_vector.len();
    if let Some(bad) = image_vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        });
    }

    let flat: Vec<f32> = image_vectors.iter().flatten().copied().collect();
    let images = Array2::from_shape_vec((image_vectors.len(), dim), flat)
        .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;
    let text = Array1::from_vec(text_vector.to_vec());

    let text_norm = text.dot(&text).sqrt();
    let image_norms = images.map_axis(ndarray::Axis(1), |row| row.dot(&row).sqrt());
    if text_norm == 0.0 || image_norms.iter().any(|n| *n == 0.0) {
        return Err(EmbeddingError::InvalidInput(
            "Cannot rank zero-length embeddings".to_string(),
        ));
    }

    let cosine = images.dot(&text) / (&image_norms * text_norm);
    let probabilities = softmax(&(cosine * logit_scale));

    let mut ranked: Vec<RankedImage> = probabilities
        .iter()
        .enumerate()
        .map(|(index, &probability)| RankedImage { index, probability })
        .collect();

    // Stable sort keeps input order for ties
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(ranked)
}

/// Numerically stable softmax
pub fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    exp / sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(angle: f32) -> Vec<f32> {
        vec![angle.cos(), angle.sin()]
    }

    #[test]
    fn test_ranks_closest_image_first() {
        let images = vec![unit(1.2), unit(0.1), unit(0.6)];
        let ranked = joint_affinity(&images, &unit(0.0), CLIP_LOGIT_SCALE).unwrap();

        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_result_is_a_permutation() {
        let images = vec![unit(0.3), unit(0.3), unit(2.0)];
        let ranked = joint_affinity(&images, &unit(0.0), CLIP_LOGIT_SCALE).unwrap();

        let mut order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        // Ties keep input order
        assert_eq!(order[..2], [0, 1]);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let images = vec![unit(0.0), unit(0.5), unit(1.0), unit(1.5)];
        let ranked = joint_affinity(&images, &unit(0.2), CLIP_LOGIT_SCALE).unwrap();

        let total: f32 = ranked.iter().map(|r| r.probability).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_empty_batch() {
        assert!(joint_affinity(&[], &unit(0.0), CLIP_LOGIT_SCALE)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let images = vec![vec![1.0, 0.0, 0.0]];
        let err = joint_affinity(&images, &unit(0.0), CLIP_LOGIT_SCALE).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }
}
