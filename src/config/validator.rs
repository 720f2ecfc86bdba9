use crate::config::Config;
use crate::error::{Result, ScoutError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

const BACKENDS: [&str; 2] = ["memory", "qdrant"];
const PROVIDERS: [&str; 3] = ["groq", "openai", "ollama"];

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if config.loader.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "loader.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScoutError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        // Paths may not exist yet; `index` creates them
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.storage.image_cache_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.image_cache_dir",
                "Image cache directory cannot be empty",
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        let backend = &config.index.backend;
        if !BACKENDS.contains(&backend.as_str()) {
            errors.push(ValidationError::new(
                "index.backend",
                format!("Backend must be one of {:?}, got '{}'", BACKENDS, backend),
            ));
        }

        if backend == "qdrant" && !config.index.qdrant_url.starts_with("http") {
            errors.push(ValidationError::new(
                "index.qdrant_url",
                format!("Invalid Qdrant URL: {}", config.index.qdrant_url),
            ));
        }

        if config.index.collection.trim().is_empty() {
            errors.push(ValidationError::new(
                "index.collection",
                "Collection name cannot be empty",
            ));
        }

        if config.index.vector_dim == 0 {
            errors.push(ValidationError::new(
                "index.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.index.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "index.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        // If LLM is enabled, validate API key environment variable is set
        if config.llm.enabled {
            let env_var = &config.llm.api_key_env;
            match std::env::var(env_var) {
                Ok(key) if key.is_empty() => errors.push(ValidationError::new(
                    "llm.api_key_env",
                    format!("Environment variable {} is empty", env_var),
                )),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "llm.api_key_env",
                    format!("Environment variable {} is not set", env_var),
                )),
            }
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        let provider = &config.llm.provider;
        if !PROVIDERS.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!("Provider must be one of {:?}, got '{}'", PROVIDERS, provider),
            ));
        }

        if config.llm.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let search = &config.search;

        for (path, threshold) in [
            ("search.feature_threshold", search.feature_threshold),
            ("search.image_threshold", search.image_threshold),
        ] {
            if !(-1.0..=1.0).contains(&threshold) {
                errors.push(ValidationError::new(
                    path,
                    format!("Cosine threshold must be within [-1, 1], got {}", threshold),
                ));
            }
        }

        for (path, limit) in [
            ("search.feature_limit", search.feature_limit),
            ("search.image_limit", search.image_limit),
            ("search.metadata_limit", search.metadata_limit),
        ] {
            if limit == 0 {
                errors.push(ValidationError::new(path, "Limit must be greater than 0"));
            }
        }
    }
}
