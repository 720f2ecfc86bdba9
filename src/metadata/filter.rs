//! Filter conditions evaluated against artwork payloads

use super::{ArtworkPayload, MetadataConstraint, MetadataQuery, TextField};
use serde::{Deserialize, Serialize};

/// Numeric payload keys that range predicates apply to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeKey {
    PeriodStart,
    PeriodEnd,
}

impl RangeKey {
    pub fn key(&self) -> &'static str {
        match self {
            RangeKey::PeriodStart => "period_start",
            RangeKey::PeriodEnd => "period_end",
        }
    }

    fn value(&self, payload: &ArtworkPayload) -> Option<i64> {
        match self {
            RangeKey::PeriodStart => payload.period_start,
            RangeKey::PeriodEnd => payload.period_end,
        }
    }
}

/// Strict numeric bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeBound {
    /// Stored value must be less than this
    Lt(i64),
    /// Stored value must be greater than this
    Gt(i64),
}

impl RangeBound {
    fn holds(&self, value: i64) -> bool {
        match *self {
            RangeBound::Lt(bound) => value < bound,
            RangeBound::Gt(bound) => value > bound,
        }
    }
}

/// Atomic condition over an artwork payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// Numeric field satisfies a strict bound; a missing value never does
    Range { key: RangeKey, bound: RangeBound },
    /// Text field contains the (lower-cased) value
    Text { field: TextField, value: String },
}

impl Predicate {
    pub fn matches(&self, payload: &ArtworkPayload) -> bool {
        match self {
            Predicate::Range { key, bound } => key.value(payload).is_some_and(|v| bound.holds(v)),
            Predicate::Text { field, value } => {
                payload.text(*field).to_lowercase().contains(value.as_str())
            }
        }
    }
}

/// Conjunction of predicates; an empty filter accepts everything
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    conditions: Vec<Predicate>,
}

impl MetadataFilter {
    pub fn new(conditions: Vec<Predicate>) -> Self {
        Self { conditions }
    }

    pub fn conditions(&self) -> &[Predicate] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, payload: &ArtworkPayload) -> bool {
        self.conditions.iter().all(|p| p.matches(payload))
    }
}

/// Translate extracted constraints into payload predicates
///
/// A period year `y` becomes `period_start < y AND period_end > y`, so an
/// artwork whose interval starts or ends exactly at `y` is not matched.
pub fn build_filter(query: &MetadataQuery) -> MetadataFilter {
    let mut conditions = Vec::with_capacity(query.len() * 2);

    for constraint in query.constraints() {
        match constraint {
            MetadataConstraint::Period(year) => {
                conditions.push(Predicate::Range {
                    key: RangeKey::PeriodStart,
                    bound: RangeBound::Lt(*year),
                });
                conditions.push(Predicate::Range {
                    key: RangeKey::PeriodEnd,
                    bound: RangeBound::Gt(*year),
                });
            }
            MetadataConstraint::Text { field, value } => {
                conditions.push(Predicate::Text {
                    field: *field,
                    value: value.to_lowercase(),
                });
            }
        }
    }

    MetadataFilter::new(conditions)
}
