/// Qdrant-backed vector store
use super::{ArtworkRecord, IndexError, QueryRequest, ScoredArtwork, VectorStore};
use crate::metadata::{ArtworkPayload, MetadataFilter, Predicate, RangeBound};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors_config, Condition, CountPointsBuilder,
    CreateCollectionBuilder, Distance, Filter, GetCollectionInfoResponse, PointStruct, Query,
    QueryPointsBuilder, Range, ScoredPoint, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::time::Duration;

fn unavailable(err: impl std::fmt::Display) -> IndexError {
    IndexError::Unavailable(err.to_string())
}

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    pub fn new(url: &str, collection: &str, timeout: Duration) -> Result<Self, IndexError> {
        let client = Qdrant::from_url(url)
            .timeout(timeout)
            .build()
            .map_err(unavailable)?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }

    async fn create(&self, dimension: usize) -> Result<(), IndexError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.clone())
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(unavailable)?;

        tracing::info!(collection = %self.collection, dimension, "Created Qdrant collection");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_if_absent(&self, dimension: usize) -> Result<(), IndexError> {
        let exists = self
            .client
            .collection_exists(self.collection.clone())
            .await
            .map_err(unavailable)?;

        if !exists {
            return self.create(dimension).await;
        }

        let info = self
            .client
            .collection_info(self.collection.clone())
            .await
            .map_err(unavailable)?;
        check_vector_size(&info, dimension)
    }

    async fn recreate(&self, dimension: usize) -> Result<(), IndexError> {
        let exists = self
            .client
            .collection_exists(self.collection.clone())
            .await
            .map_err(unavailable)?;

        if exists {
            self.client
                .delete_collection(self.collection.clone())
                .await
                .map_err(unavailable)?;
        }
        self.create(dimension).await
    }

    async fn upsert(&self, records: Vec<ArtworkRecord>) -> Result<(), IndexError> {
        let points = records
            .into_iter()
            .map(|record| {
                let payload = to_payload(&record.payload)?;
                Ok(PointStruct::new(record.id, record.vector, payload))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<ScoredArtwork>, IndexError> {
        let mut search = QueryPointsBuilder::new(self.collection.clone())
            .query(Query::new_nearest(request.vector.clone()))
            .limit(request.limit as u64)
            .with_payload(true);

        if let Some(filter) = request.filter.as_ref().filter(|f| !f.is_empty()) {
            search = search.filter(to_qdrant_filter(filter));
        }
        if let Some(threshold) = request.score_threshold {
            search = search.score_threshold(threshold);
        }

        let response = self.client.query(search).await.map_err(unavailable)?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| match from_scored_point(point) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unreadable Qdrant point");
                    None
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, IndexError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.clone()).exact(true))
            .await
            .map_err(unavailable)?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }
}

/// Vector size of an unnamed-vector collection, if the info carries one
fn vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let config = info
        .result
        .as_ref()?
        .config
        .as_ref()?
        .params
        .as_ref()?
        .vectors_config
        .as_ref()?
        .config
        .as_ref()?;

    match config {
        vectors_config::Config::Params(params) => Some(params.size),
        vectors_config::Config::ParamsMap(_) => None,
    }
}

fn check_vector_size(
    info: &GetCollectionInfoResponse,
    dimension: usize,
) -> Result<(), IndexError> {
    match vector_size(info) {
        Some(size) if size != dimension as u64 => Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: size as usize,
        }),
        Some(_) => Ok(()),
        None => Err(IndexError::Unavailable(
            "Collection has no single unnamed vector configuration".to_string(),
        )),
    }
}

/// Translate predicates into a conjunctive Qdrant filter
pub(crate) fn to_qdrant_filter(filter: &MetadataFilter) -> Filter {
    Filter::must(filter.conditions().iter().map(|predicate| match predicate {
        Predicate::Range { key, bound } => {
            let range = match bound {
                RangeBound::Lt(value) => Range {
                    lt: Some(*value as f64),
                    ..Default::default()
                },
                RangeBound::Gt(value) => Range {
                    gt: Some(*value as f64),
                    ..Default::default()
                },
            };
            Condition::range(key.key(), range)
        }
        Predicate::Text { field, value } => Condition::matches_text(field.key(), value.clone()),
    }))
}

fn to_payload(payload: &ArtworkPayload) -> Result<Payload, IndexError> {
    let json = serde_json::to_value(payload)
        .map_err(|e| IndexError::InvalidRecord(format!("Unserializable payload: {}", e)))?;

    let serde_json::Value::Object(map) = json else {
        return Err(IndexError::InvalidRecord(
            "Payload must serialize to an object".to_string(),
        ));
    };

    let mut out = Payload::new();
    for (key, value) in map {
        out.insert(key, value);
    }
    Ok(out)
}

fn from_scored_point(point: ScoredPoint) -> Result<ScoredArtwork, IndexError> {
    let id = match point.id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(id)) => id,
        Some(PointIdOptions::Uuid(uuid)) => {
            return Err(IndexError::InvalidRecord(format!(
                "Unexpected UUID point id {}",
                uuid
            )))
        }
        None => return Err(IndexError::InvalidRecord("Point without id".to_string())),
    };

    let payload = from_payload(point.payload)?;

    Ok(ScoredArtwork {
        id,
        score: point.score,
        payload,
    })
}

fn from_payload(payload: HashMap<String, Value>) -> Result<ArtworkPayload, IndexError> {
    let object: serde_json::Map<String, serde_json::Value> = payload
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect();

    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| IndexError::InvalidRecord(format!("Malformed payload: {}", e)))
}

fn to_json(value: Value) -> serde_json::Value {
    match value.kind {
        Some(Kind::StringValue(text)) => serde_json::Value::String(text),
        Some(Kind::IntegerValue(n)) => serde_json::Value::from(n),
        Some(Kind::DoubleValue(n)) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(to_json).collect())
        }
        Some(Kind::StructValue(object)) => serde_json::Value::Object(
            object
                .fields
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}
