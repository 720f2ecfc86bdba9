/// In-process exhaustive cosine store
use super::{ArtworkRecord, IndexError, QueryRequest, ScoredArtwork, VectorStore};
use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct MemoryState {
    dimension: Option<usize>,
    /// Records in insertion order
    records: Vec<ArtworkRecord>,
    /// id -> position in `records`
    slots: AHashMap<u64, usize>,
}

impl MemoryState {
    fn reset(&mut self, dimension: usize) {
        self.dimension = Some(dimension);
        self.records.clear();
        self.slots.clear();
    }

    fn upsert(&mut self, record: ArtworkRecord) {
        match self.slots.get(&record.id) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.slots.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dimension: Option<usize>,
    records: Vec<ArtworkRecord>,
}

/// Exact nearest-neighbour store that scans every record
///
/// Scores are cosine similarity. Equal scores keep insertion order, so
/// results are deterministic for a fixed index state. When opened with a
/// snapshot path, [`VectorStore::flush`] writes a zstd-compressed JSON
/// snapshot that is reloaded on the next open.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Volatile store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            snapshot_path: None,
        }
    }

    /// Store backed by a snapshot file, loading it when present
    pub fn open(snapshot_path: PathBuf) -> Result<Self, IndexError> {
        let mut state = MemoryState::default();

        if snapshot_path.exists() {
            let snapshot = read_snapshot(&snapshot_path)?;
            state.dimension = snapshot.dimension;
            for record in snapshot.records {
                state.upsert(record);
            }
            tracing::info!(
                path = %snapshot_path.display(),
                records = state.records.len(),
                "Loaded index snapshot"
            );
        }

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(snapshot_path),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, IndexError> {
        self.state
            .read()
            .map_err(|_| IndexError::Unavailable("memory index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, IndexError> {
        self.state
            .write()
            .map_err(|_| IndexError::Unavailable("memory index lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn create_if_absent(&self, dimension: usize) -> Result<(), IndexError> {
        let mut state = self.write()?;
        match state.dimension {
            None => {
                state.dimension = Some(dimension);
                Ok(())
            }
            Some(existing) if existing == dimension => Ok(()),
            Some(existing) => Err(IndexError::DimensionMismatch {
                expected: existing,
                actual: dimension,
            }),
        }
    }

    async fn recreate(&self, dimension: usize) -> Result<(), IndexError> {
        self.write()?.reset(dimension);
        Ok(())
    }

    async fn upsert(&self, records: Vec<ArtworkRecord>) -> Result<(), IndexError> {
        let mut state = self.write()?;
        let dimension = state
            .dimension
            .ok_or_else(|| IndexError::Unavailable("collection does not exist".to_string()))?;

        for record in records {
            if record.vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: record.vector.len(),
                });
            }
            state.upsert(record);
        }

        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<ScoredArtwork>, IndexError> {
        let state = self.read()?;

        let mut hits: Vec<ScoredArtwork> = state
            .records
            .iter()
            .filter(|record| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter.matches(&record.payload))
            })
            .map(|record| (record, cosine_similarity(&request.vector, &record.vector)))
            .filter(|(_, score)| request.score_threshold.map_or(true, |t| *score >= t))
            .map(|(record, score)| ScoredArtwork {
                id: record.id,
                score,
                payload: record.payload.clone(),
            })
            .collect();

        // Stable: equal scores stay in insertion order
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(request.limit);

        Ok(hits)
    }

    async fn count(&self) -> Result<u64, IndexError> {
        Ok(self.read()?.records.len() as u64)
    }

    async fn flush(&self) -> Result<(), IndexError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let encoded = {
            let state = self.read()?;
            let snapshot = Snapshot {
                dimension: state.dimension,
                records: state.records.clone(),
            };
            serde_json::to_vec(&snapshot).map_err(|e| IndexError::Snapshot(e.to_string()))?
        };

        write_snapshot(path, &encoded)?;
        tracing::debug!(path = %path.display(), bytes = encoded.len(), "Wrote index snapshot");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

fn read_snapshot(path: &Path) -> Result<Snapshot, IndexError> {
    let compressed = std::fs::read(path)
        .map_err(|e| IndexError::Snapshot(format!("Failed to read {}: {}", path.display(), e)))?;
    let data = zstd::decode_all(&compressed[..])
        .map_err(|e| IndexError::Snapshot(format!("Failed to decompress snapshot: {}", e)))?;

    serde_json::from_slice(&data)
        .map_err(|e| IndexError::Snapshot(format!("Failed to parse snapshot: {}", e)))
}

/// Compress and write via a temp file so a crash never leaves a torn snapshot
fn write_snapshot(path: &Path, data: &[u8]) -> Result<(), IndexError> {
    let compressed = zstd::encode_all(data, 3)
        .map_err(|e| IndexError::Snapshot(format!("Failed to compress snapshot: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            IndexError::Snapshot(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = std::fs::File::create(&temp_path).map_err(|e| {
        IndexError::Snapshot(format!("Failed to create {}: {}", temp_path.display(), e))
    })?;
    file.write_all(&compressed)
        .and_then(|_| file.sync_all())
        .map_err(|e| IndexError::Snapshot(format!("Failed to write {}: {}", temp_path.display(), e)))?;
    drop(file);

    std::fs::rename(&temp_path, path).map_err(|e| {
        IndexError::Snapshot(format!(
            "Failed to rename {} -> {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })
}
