//! Artscout - natural-language and image search over artwork collections
//!
//! Artwork images are embedded with CLIP and stored with normalized
//! catalogue metadata. Queries are routed to visual similarity search,
//! metadata-filtered search, or a hybrid that re-ranks metadata matches by
//! joint image/text affinity.

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod images;
pub mod index;
pub mod ingest;
pub mod metadata;
pub mod retrieval;

pub use error::{Result, ScoutError};
