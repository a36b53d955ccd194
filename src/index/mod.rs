//! Similarity index over precomputed document embeddings
//!
//! Indexes are built offline, loaded read-only, and answer top-k inner-product
//! queries. Every backend returns hits sorted by descending score with ties
//! broken by ascending document id.

mod artifact;
mod flat;
mod hnsw;

pub use artifact::{read_index, write_index, IndexArtifact};
pub use flat::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};

use crate::config::RetrievalConfig;
use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: index has {expected} dimensions, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index build failed: {0}")]
    Build(String),

    #[error("Malformed index artifact: {0}")]
    Format(String),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
}

/// One ranked result: document id and inner-product similarity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub score: f32,
}

/// Read-only k-nearest-neighbour search
pub trait SimilarityIndex: Send + Sync {
    /// Return `min(k, len())` hits, best first
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError>;

    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every document id held by the index, ascending
    fn ids(&self) -> Vec<u64>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Argument checks shared by every backend
pub(crate) fn check_query(query: &[f32], k: usize, dimension: usize) -> Result<(), IndexError> {
    if k < 1 {
        return Err(IndexError::InvalidArgument(format!(
            "k must be at least 1, got {}",
            k
        )));
    }
    if query.len() != dimension {
        return Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Result order: descending score, then ascending id
///
/// NaN sorts last and -0.0 equals 0.0, so the order is total.
pub(crate) fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    let key = |score: f32| {
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score + 0.0
        }
    };
    key(b.score)
        .total_cmp(&key(a.score))
        .then_with(|| a.id.cmp(&b.id))
}

/// Build the backend named by `retrieval.backend` from a loaded artifact
pub fn build_index(
    artifact: IndexArtifact,
    config: &RetrievalConfig,
) -> Result<Box<dyn SimilarityIndex>, IndexError> {
    match config.backend.as_str() {
        "flat" => Ok(Box::new(FlatIndex::from_artifact(artifact)?)),
        "hnsw" => {
            let params = HnswParams {
                m: config.hnsw_m,
                ef_construction: config.hnsw_ef_construction,
                ef_search: config.hnsw_ef_search,
            };
            Ok(Box::new(HnswIndex::from_artifact(artifact, params)?))
        }
        other => Err(IndexError::InvalidArgument(format!(
            "Unknown index backend: {}. Supported: flat, hnsw",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order_ties_by_id() {
        let mut hits = vec![
            SearchHit { id: 9, score: 0.5 },
            SearchHit { id: 2, score: 0.9 },
            SearchHit { id: 4, score: 0.5 },
            SearchHit { id: 1, score: -0.0 },
            SearchHit { id: 0, score: 0.0 },
        ];
        hits.sort_by(rank_order);

        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 4, 9, 0, 1]);
    }

    #[test]
    fn test_nan_sorts_last() {
        let mut hits = vec![
            SearchHit { id: 0, score: f32::NAN },
            SearchHit { id: 1, score: -1.0 },
        ];
        hits.sort_by(rank_order);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_check_query() {
        assert!(matches!(
            check_query(&[0.0; 4], 0, 4),
            Err(IndexError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_query(&[0.0; 3], 1, 4),
            Err(IndexError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(check_query(&[0.0; 4], 1, 4).is_ok());
    }

    #[test]
    fn test_unknown_backend() {
        let artifact = IndexArtifact::new(2, vec![(0, vec![1.0, 0.0])]).unwrap();
        let config = RetrievalConfig {
            backend: "ivf".to_string(),
            ..RetrievalConfig::default()
        };
        assert!(build_index(artifact, &config).is_err());
    }
}
