//! Configuration management for artscout
//!
//! Settings live in a single TOML file. Loading applies `ARTSCOUT_*`
//! environment overrides and then validates the result, reporting every
//! violation at once.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub loader: LoaderConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Folder scanned for images when no catalog file is given
    pub image_store: PathBuf,
    /// Where downloaded images are cached
    pub image_cache_dir: PathBuf,
}

/// Vector index backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "memory" or "qdrant"
    pub backend: String,
    pub qdrant_url: String,
    pub collection: String,
    pub vector_dim: usize,
    pub timeout_ms: u64,
    /// Memory backend only: write a snapshot under `storage.data_dir`
    pub persist: bool,
}

impl IndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// LLM configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_base: String,
    pub path: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_ms: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

/// Result limits and similarity thresholds per strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub feature_limit: usize,
    pub feature_threshold: f32,
    pub image_limit: usize,
    pub image_threshold: f32,
    pub metadata_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            feature_limit: 2000,
            feature_threshold: 0.2,
            image_limit: 10000,
            image_threshold: 0.75,
            metadata_limit: 100,
        }
    }
}

/// Image loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub timeout_ms: u64,
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Keyword lists used by the offline extractor and router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub mediums: Vec<String>,
    pub supports: Vec<String>,
    /// Words that mark a query as being about metadata
    pub metadata_keywords: Vec<String>,
    /// Words that mark a query as being about visual traits
    pub visual_keywords: Vec<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mediums: strings(&[
                "oil", "acrylic", "watercolour", "watercolor", "gouache", "charcoal", "ink",
                "tempera", "pastel", "pigment", "etching", "lithograph", "stencil", "print",
                "pencil", "graphite",
            ]),
            supports: strings(&[
                "canvas", "paper", "board", "cardboard", "wood", "fabric", "metal", "plastic",
            ]),
            metadata_keywords: strings(&[
                "stencil", "mounted", "board", "paper", "canvas", "fragile", "wood", "fabric",
                "cardboard", "ink", "print", "metal", "plastic", "acrylic", "watercolor",
                "watercolour", "gouache", "charcoal", "pigment", "etching", "lithograph", "oil",
                "artist", "department", "period", "century", "medium", "by",
            ]),
            visual_keywords: strings(&[
                "red", "blue", "green", "yellow", "black", "white", "orange", "purple", "pink",
                "brown", "grey", "gray", "colour", "color", "colorful", "colourful", "background",
                "depict", "depicts", "depicting", "showing", "abstract", "geometric", "pattern",
                "portrait", "landscape", "horse", "horses", "animal", "animals", "tree", "trees",
                "face", "faces", "figure", "figures", "sky", "water", "flower", "flowers",
                "bright", "dark",
            ]),
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_enabled: Option<bool>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScoutError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ScoutError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScoutError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ScoutError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| ScoutError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(backend) = overrides.index_backend {
            self.index.backend = backend;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: ARTSCOUT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("ARTSCOUT_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            "STORAGE__IMAGE_STORE" => self.storage.image_store = PathBuf::from(value),
            "INDEX__BACKEND" => self.index.backend = value.to_string(),
            "INDEX__QDRANT_URL" => self.index.qdrant_url = value.to_string(),
            "INDEX__COLLECTION" => self.index.collection = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "LLM__ENABLED" => self.llm.enabled = parse_env(path, value)?,
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__API_BASE" => self.llm.api_base = value.to_string(),
            "SEARCH__FEATURE_THRESHOLD" => self.search.feature_threshold = parse_env(path, value)?,
            "SEARCH__IMAGE_THRESHOLD" => self.search.image_threshold = parse_env(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Snapshot file of the memory backend
    pub fn snapshot_path(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir).join(format!("{}.snapshot.zst", self.index.collection))
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ScoutError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("artscout").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| ScoutError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".artscout"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ScoutError::InvalidConfigValue {
        path: path.to_string(),
        message: format!(
            "Cannot parse '{}' as {}",
            value,
            std::any::type_name::<T>()
        ),
    })
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.artscout");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: data_dir.clone(),
                image_store: PathBuf::from("image_store"),
                image_cache_dir: data_dir.join("image_cache"),
            },
            index: IndexConfig {
                backend: "memory".to_string(),
                qdrant_url: "http://localhost:6334".to_string(),
                collection: "image_embeddings".to_string(),
                vector_dim: 512,
                timeout_ms: 10_000,
                persist: true,
            },
            embedding: EmbeddingConfig {
                model: "clip-vit-b-32".to_string(),
                batch_size: 32,
            },
            llm: LlmConfig {
                enabled: false,
                provider: "groq".to_string(),
                api_base: "https://api.groq.com/openai".to_string(),
                path: "/v1/chat/completions".to_string(),
                api_key_env: "GROQ_API_KEY".to_string(),
                model: "openai/gpt-oss-20b".to_string(),
                temperature: 0.0,
                timeout_ms: 20_000,
            },
            search: SearchConfig::default(),
            loader: LoaderConfig { timeout_ms: 10_000 },
            extraction: ExtractionConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_round_trips_through_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.index.collection, "image_embeddings");
        assert_eq!(loaded.index.vector_dim, 512);
        assert_eq!(loaded.search.feature_limit, 2000);
        assert_eq!(loaded.search.image_threshold, 0.75);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/artscout.toml"));
        assert!(matches!(result, Err(ScoutError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_profile_overrides() {
        let mut config = Config::default();
        config.profiles.insert(
            "remote".to_string(),
            ProfileOverrides {
                index_backend: Some("qdrant".to_string()),
                embedding_model: None,
                llm_enabled: None,
            },
        );

        config.apply_profile("remote").unwrap();
        assert_eq!(config.index.backend, "qdrant");
        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config
            .set_value_from_env("SEARCH__FEATURE_THRESHOLD", "0.3")
            .unwrap();
        assert_eq!(config.search.feature_threshold, 0.3);

        assert!(config.set_value_from_env("LLM__ENABLED", "maybe").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let plain = PathBuf::from("/tmp/data");
        assert_eq!(expand_tilde(&plain), plain);

        let expanded = expand_tilde(Path::new("~/.artscout"));
        assert!(!expanded.starts_with("~"));
    }

    #[test]
    fn test_snapshot_path_uses_collection() {
        let mut config = Config::default();
        config.storage.data_dir = PathBuf::from("/var/lib/artscout");
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/var/lib/artscout/image_embeddings.snapshot.zst")
        );
    }
}
