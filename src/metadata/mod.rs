//! Artwork metadata: payload normalization, typed query constraints and
//! the filter builder used by filtered similarity search.

mod filter;
mod payload;
mod period;
mod query;

pub use filter::{build_filter, MetadataFilter, Predicate, RangeBound, RangeKey};
pub use payload::{normalize_text, ArtworkPayload, UNKNOWN};
pub use period::{extract_years, normalize_period, normalize_period_at, PeriodRange};
pub use query::{ExtractionError, MetadataConstraint, MetadataQuery};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-text metadata fields that can be matched by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Medium,
    Department,
    PaperSupport,
    ArtistName,
}

impl TextField {
    pub const ALL: [TextField; 4] = [
        TextField::Medium,
        TextField::Department,
        TextField::PaperSupport,
        TextField::ArtistName,
    ];

    /// Payload key for this field
    pub fn key(&self) -> &'static str {
        match self {
            TextField::Medium => "medium",
            TextField::Department => "department",
            TextField::PaperSupport => "paper_support",
            TextField::ArtistName => "artist_name",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Payload key of the period field in extraction output
pub const PERIOD_KEY: &str = "period";
