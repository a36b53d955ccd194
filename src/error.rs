use crate::embedding::EmbeddingError;
use crate::index::IndexError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the retrieval core
#[derive(Error, Debug)]
pub enum RagError {
    /// Caller supplied an unusable argument (k == 0, empty query)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding model failed to produce a vector
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Similarity index failure, including dimension mismatches
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Index and metadata artifacts disagree
    #[error("Corpus consistency error: {0}")]
    CorpusConsistency(String),

    /// Embedding or search exceeded the configured deadline
    #[error("Retrieval timed out after {deadline:?}")]
    Timeout { deadline: Duration },

    /// Metadata artifact could not be decoded
    #[error("Invalid artifact {path}: {message}")]
    Artifact { path: PathBuf, message: String },

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of a [`RagError`], one entry per row of the error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Embedding,
    DimensionMismatch,
    Index,
    CorpusConsistency,
    Timeout,
    Config,
    Io,
}

impl RagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RagError::Embedding(_) => ErrorKind::Embedding,
            RagError::Index(IndexError::DimensionMismatch { .. }) => ErrorKind::DimensionMismatch,
            RagError::Index(IndexError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            RagError::Index(IndexError::Format(_)) => ErrorKind::CorpusConsistency,
            RagError::Index(_) => ErrorKind::Index,
            RagError::CorpusConsistency(_) => ErrorKind::CorpusConsistency,
            RagError::Timeout { .. } => ErrorKind::Timeout,
            RagError::Artifact { .. } => ErrorKind::CorpusConsistency,
            RagError::Config(_)
            | RagError::ConfigValidation { .. }
            | RagError::ConfigNotFound { .. }
            | RagError::InvalidConfigValue { .. }
            | RagError::Toml(_)
            | RagError::TomlSerialization(_) => ErrorKind::Config,
            RagError::Io { .. } | RagError::Json { .. } | RagError::Other(_) => ErrorKind::Io,
        }
    }

    /// Artifact-level faults: the service must stop answering rather than degrade
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DimensionMismatch | ErrorKind::CorpusConsistency
        )
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for retrieval operations
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let err = RagError::from(IndexError::DimensionMismatch {
            expected: 384,
            actual: 256,
        });
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_per_query_errors_are_not_fatal() {
        let err = RagError::InvalidArgument("k must be at least 1".to_string());
        assert!(!err.is_fatal());

        let err = RagError::Timeout {
            deadline: Duration::from_millis(10),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!err.is_fatal());

        let err = RagError::from(EmbeddingError::GenerationError("boom".to_string()));
        assert_eq!(err.kind(), ErrorKind::Embedding);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_malformed_index_artifact_is_fatal() {
        let err = RagError::from(IndexError::Format("Checksum mismatch".to_string()));
        assert_eq!(err.kind(), ErrorKind::CorpusConsistency);
        assert!(err.is_fatal());

        let err = RagError::from(IndexError::Build("HNSW parameters".to_string()));
        assert_eq!(err.kind(), ErrorKind::Index);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_corpus_consistency_is_fatal() {
        let err = RagError::CorpusConsistency("id 7 missing".to_string());
        assert!(err.is_fatal());
        assert!(err.to_string().contains("id 7"));
    }
}
