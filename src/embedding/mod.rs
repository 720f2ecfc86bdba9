/// Embedding generation and joint text/image ranking
///
/// Architecture:
/// - EmbeddingProvider trait for abstraction
/// - ClipProvider for local CLIP ViT-B/32 embeddings (512-dim, text + image)
/// - Batch softmax affinity for ranking candidate images against a caption
mod affinity;
mod provider;

pub use affinity::{joint_affinity, softmax, RankedImage, CLIP_LOGIT_SCALE};
pub use provider::{l2_normalize, ClipProvider, EmbeddingError, EmbeddingProvider};
