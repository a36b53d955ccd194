//! Exact inner-product index (brute-force scan)
use super::{check_query, rank_order, IndexArtifact, IndexError, SearchHit, SimilarityIndex};
use ndarray::{Array2, ArrayView1};

/// Flat index: one row per document, scored with a single matrix-vector product
pub struct FlatIndex {
    ids: Vec<u64>,
    /// `len x dimension`
    matrix: Array2<f32>,
    dimension: usize,
}

impl FlatIndex {
    pub fn from_artifact(artifact: IndexArtifact) -> Result<Self, IndexError> {
        let dimension = artifact.dimension();
        let (ids, vectors) = artifact.into_parts();

        let matrix = Array2::from_shape_vec((ids.len(), dimension), vectors)
            .map_err(|e| IndexError::Build(e.to_string()))?;

        Ok(Self {
            ids,
            matrix,
            dimension,
        })
    }
}

impl SimilarityIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        check_query(query, k, self.dimension)?;

        let scores = self.matrix.dot(&ArrayView1::from(query));

        let mut hits: Vec<SearchHit> = self
            .ids
            .iter()
            .zip(scores.iter())
            .map(|(&id, &score)| SearchHit { id, score })
            .collect();

        hits.sort_by(rank_order);
        hits.truncate(k);
        Ok(hits)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn ids(&self) -> Vec<u64> {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids
    }

    fn backend(&self) -> &'static str {
        "flat"
    }
}
