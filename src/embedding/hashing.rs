//! Model-free feature-hashing embedder
//!
//! Tokens are lowercased alphanumeric runs. Each token is hashed with BLAKE3:
//! the first eight digest bytes pick a bucket, the ninth byte's low bit picks
//! the sign. The bucket counts are L2-normalized. The output depends only on
//! the text, so vectors are bit-identical across runs and machines.

use super::provider::check_text;
use super::{l2_normalize, EmbeddingError, EmbeddingProvider};
use regex::Regex;

pub struct HashingEmbedder {
    dimension: usize,
    max_tokens: usize,
    token_pattern: Regex,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize, max_tokens: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 || max_tokens == 0 {
            return Err(EmbeddingError::InitializationError(
                "Dimension and token limit must be greater than 0".to_string(),
            ));
        }

        let token_pattern = Regex::new(r"[\p{L}\p{N}]+")
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            dimension,
            max_tokens,
            token_pattern,
            model_name: format!("hashing-{}", dimension),
        })
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = blake3::hash(token.as_bytes());
        let bytes = digest.as_bytes();

        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        let bucket = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

        (bucket, sign)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        check_text(text)?;

        let lowered = text.to_lowercase();
        let mut vector = vec![0.0f32; self.dimension];
        let mut seen = 0usize;

        // Tokens past the limit are dropped, mirroring tokenizer truncation
        for token in self
            .token_pattern
            .find_iter(&lowered)
            .take(self.max_tokens)
        {
            let (bucket, sign) = self.bucket(token.as_str());
            vector[bucket] += sign;
            seen += 1;
        }

        if seen == 0 {
            return Err(EmbeddingError::InvalidInput(format!(
                "No tokens in text: {:?}",
                text
            )));
        }

        l2_normalize(&mut vector).map_err(|_| {
            // Every token cancelled out in its bucket
            EmbeddingError::GenerationError(format!("Degenerate embedding for {:?}", text))
        })?;

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty batch".to_string()));
        }
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
