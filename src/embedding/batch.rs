//! Batch embedding for the offline corpus build
use super::{EmbeddingError, EmbeddingProvider};
use std::sync::Arc;
use tracing::{debug, info};

/// Vectors produced for a corpus, aligned with the input order
#[derive(Debug)]
pub struct EmbeddedBatch {
    pub vectors: Vec<Vec<f32>>,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Embeds large text collections in fixed-size batches
///
/// Unlike query-time embedding, a failed batch aborts the whole run: a corpus
/// with holes would break the one-vector-per-document invariant.
pub struct BatchEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchEmbedder {
    /// Create a new batch embedder
    ///
    /// # Arguments
    /// * `provider` - Embedding provider
    /// * `batch_size` - Number of texts to embed per model call
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed every text, preserving order
    pub fn embed_all(&self, texts: &[String]) -> Result<EmbeddedBatch, EmbeddingError> {
        let start = std::time::Instant::now();
        let total = texts.len();

        info!(
            "Embedding {} texts with {} (batch size {})",
            total,
            self.provider.model_name(),
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(total);
        let mut batches = 0;

        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.provider.embed_batch(chunk)?;

            if embeddings.len() != chunk.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }

            for embedding in &embeddings {
                if embedding.len() != self.provider.dimension() {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.provider.dimension(),
                        actual: embedding.len(),
                    });
                }
            }

            vectors.extend(embeddings);
            batches += 1;
            debug!("Embedded batch {} ({}/{})", batches, vectors.len(), total);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Embedding complete: {} vectors in {} batches, {}ms",
            vectors.len(),
            batches,
            duration_ms
        );

        Ok(EmbeddedBatch {
            vectors,
            batches,
            duration_ms,
        })
    }
}
