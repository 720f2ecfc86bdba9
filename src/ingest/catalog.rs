/// Catalog sources: JSON manifests and image folders
use crate::error::{Result, ScoutError};
use crate::metadata::{ArtworkPayload, TextField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// File extensions picked up from image folders (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One artwork to ingest: an image path or URL plus raw metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(alias = "image", alias = "image_path", alias = "url")]
    pub path: String,
    /// Free-text period, or a bare year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_support: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CatalogEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: None,
            path: path.into(),
            period: None,
            medium: None,
            department: None,
            paper_support: None,
            artist_name: None,
            extra: BTreeMap::new(),
        }
    }

    fn text(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::Medium => self.medium.as_deref(),
            TextField::Department => self.department.as_deref(),
            TextField::PaperSupport => self.paper_support.as_deref(),
            TextField::ArtistName => self.artist_name.as_deref(),
        }
    }

    fn period_text(&self) -> Option<String> {
        match self.period.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Normalized payload for the index
    pub fn to_payload(&self) -> ArtworkPayload {
        let period = self.period_text();
        let mut payload = ArtworkPayload::new(self.path.clone()).with_period_text(period.as_deref());

        for field in TextField::ALL {
            payload = payload.with_text(field, self.text(field));
        }
        for (key, value) in &self.extra {
            payload = payload.with_extra(key.clone(), value.clone());
        }

        payload
    }
}

/// Read a manifest holding either a JSON array of entries or one entry per line
pub fn catalog_from_file(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::Io {
        source: e,
        context: format!("Failed to read catalog {}", path.display()),
    })?;

    let entries = if content.trim_start().starts_with('[') {
        serde_json::from_str(&content).map_err(|e| ScoutError::Json {
            source: e,
            context: format!("Failed to parse catalog {}", path.display()),
        })?
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| ScoutError::Json {
                    source: e,
                    context: format!("{}:{}", path.display(), n + 1),
                })
            })
            .collect::<Result<Vec<CatalogEntry>>>()?
    };

    info!("Loaded {} catalog entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// List image files in a folder, sorted by name
///
/// Each entry's id and `index` field are its position in that order. A
/// missing folder is created and yields no entries.
pub fn catalog_from_folder(dir: &Path) -> Result<Vec<CatalogEntry>> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ScoutError::Io {
            source: e,
            context: format!("Failed to create image folder {}", dir.display()),
        })?;
        info!("Created empty image folder {}", dir.display());
        return Ok(Vec::new());
    }

    if !dir.is_dir() {
        return Err(ScoutError::Catalog(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let read_dir = std::fs::read_dir(dir).map_err(|e| ScoutError::Io {
        source: e,
        context: format!("Failed to list {}", dir.display()),
    })?;

    let mut paths = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| ScoutError::Io {
            source: e,
            context: format!("Failed to list {}", dir.display()),
        })?;
        let path = entry.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(position, path)| {
            let mut entry = CatalogEntry::new(path.display().to_string());
            entry.id = Some(position as u64);
            entry
                .extra
                .insert("index".to_string(), serde_json::Value::from(position));
            entry
        })
        .collect())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
