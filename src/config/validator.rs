use crate::config::Config;
use crate::error::{RagError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every violation at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_artifacts(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RagError::ConfigValidation { errors })
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

    fn validate_artifacts(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked when the retriever loads; paths may contain ~
        if config.artifacts.index_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "artifacts.index_path",
                "Index path cannot be empty",
            ));
        }

        if config.artifacts.metadata_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "artifacts.metadata_path",
                "Metadata path cannot be empty",
            ));
        }

        if config.artifacts.index_path == config.artifacts.metadata_path {
            errors.push(ValidationError::new(
                "artifacts.metadata_path",
                "Index and metadata artifacts must be different files",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        let valid_providers = ["fastembed", "hashing"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.max_length == 0 {
            errors.push(ValidationError::new(
                "embedding.max_length",
                "Token limit must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.default_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.default_k",
                "default_k must be at least 1",
            ));
        }

        let backend = &config.retrieval.backend;
        if backend != "flat" && backend != "hnsw" {
            errors.push(ValidationError::new(
                "retrieval.backend",
                format!("Backend must be 'flat' or 'hnsw', got '{}'", backend),
            ));
        }

        if config.retrieval.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "retrieval.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.retrieval.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "retrieval.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.retrieval.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "retrieval.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }

        if config.retrieval.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "retrieval.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }
}
