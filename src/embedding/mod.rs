//! Embedding generation
//!
//! Maps text to unit-length dense vectors so that inner product equals cosine
//! similarity.
//! - EmbeddingProvider trait for abstraction
//! - FastEmbedProvider for local sentence-transformer models (all-MiniLM-L6-v2, 384-dim)
//! - HashingEmbedder for model-free, deterministic vectors
//! - BatchEmbedder for offline corpus embedding

mod batch;
mod hashing;
mod provider;

pub use batch::{BatchEmbedder, EmbeddedBatch};
pub use hashing::HashingEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};

use crate::config::EmbeddingConfig;
use std::sync::Arc;

/// Build the embedding backend named by `embedding.provider`
///
/// This is the expensive step (model weights are fetched and initialized),
/// so callers create the provider once and share the returned handle.
pub fn create_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "fastembed" => {
            let provider = FastEmbedProvider::new(
                &config.model,
                config.max_length,
                config.cache_dir.clone(),
            )?;
            Ok(Arc::new(provider))
        }
        "hashing" => Ok(Arc::new(HashingEmbedder::new(
            config.dimension,
            config.max_length,
        )?)),
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding provider: {}. Supported: fastembed, hashing",
            other
        ))),
    }
}

/// Scale a vector to unit Euclidean length in place
///
/// Fails on zero or non-finite vectors, which have no direction.
pub fn l2_normalize(vector: &mut [f32]) -> Result<(), EmbeddingError> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(EmbeddingError::GenerationError(format!(
            "Cannot normalize vector with norm {}",
            norm
        )));
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_rejects_zero() {
        let mut v = vec![0.0; 8];
        assert!(l2_normalize(&mut v).is_err());
    }

    #[test]
    fn test_create_hashing_provider() {
        let config = EmbeddingConfig {
            provider: "hashing".to_string(),
            dimension: 64,
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dimension(), 64);
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
