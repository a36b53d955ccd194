//! HNSW index for approximate similarity search
use super::{check_query, rank_order, IndexArtifact, IndexError, SearchHit, SimilarityIndex};
use hnsw_rs::prelude::*;

/// Graph parameters
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    /// Number of connections per layer
    pub m: usize,
    /// Construction beam width (higher = better recall, slower build)
    pub ef_construction: usize,
    /// Search beam width (higher = better recall, slower search)
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
        }
    }
}

/// HNSW graph built in memory from an index artifact
///
/// Uses cosine distance, which ranks unit vectors like inner product.
/// Candidates returned by the graph are re-scored exactly and sorted with the
/// same tie-break as [`super::FlatIndex`], so results differ from an exact scan
/// only when the graph misses a neighbour (typically around near-ties).
pub struct HnswIndex {
    graph: Hnsw<'static, f32, DistCosine>,
    /// Graph data id (row offset) -> document id
    rows: Vec<u64>,
    vectors: Vec<f32>,
    dimension: usize,
    ef_search: usize,
}

impl HnswIndex {
    pub fn from_artifact(artifact: IndexArtifact, params: HnswParams) -> Result<Self, IndexError> {
        if params.m == 0 || params.ef_construction == 0 || params.ef_search == 0 {
            return Err(IndexError::Build(
                "HNSW parameters must be greater than 0".to_string(),
            ));
        }

        let dimension = artifact.dimension();
        let count = artifact.len();
        let max_layer = 16.min((count.max(2) as f32).ln().ceil() as usize).max(1);

        let graph = Hnsw::<f32, DistCosine>::new(
            params.m,
            count.max(1),
            max_layer,
            params.ef_construction,
            DistCosine,
        );

        for row in 0..count {
            let data = artifact.row(row).to_vec();
            graph.insert((&data, row));
        }

        let (ids, vectors) = artifact.into_parts();

        tracing::debug!(
            "Built HNSW graph: {} vectors, {}D, m={}, ef_construction={}",
            count,
            dimension,
            params.m,
            params.ef_construction
        );

        Ok(Self {
            graph,
            rows: ids,
            vectors,
            dimension,
            ef_search: params.ef_search,
        })
    }

    fn score(&self, row: usize, query: &[f32]) -> f32 {
        self.vectors[row * self.dimension..(row + 1) * self.dimension]
            .iter()
            .zip(query)
            .map(|(a, b)| a * b)
            .sum()
    }
}

impl SimilarityIndex for HnswIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        check_query(query, k, self.dimension)?;

        if self.rows.is_empty() {
            return Ok(Vec::new());
        }

        let want = k.min(self.rows.len());
        let candidates = want.max(self.ef_search).min(self.rows.len());
        let neighbours = self.graph.search(query, candidates, self.ef_search.max(candidates));

        let mut hits: Vec<SearchHit> = neighbours
            .into_iter()
            .filter(|n| n.d_id < self.rows.len())
            .map(|n| SearchHit {
                id: self.rows[n.d_id],
                score: self.score(n.d_id, query),
            })
            .collect();

        hits.sort_by(rank_order);
        hits.dedup_by_key(|h| h.id);
        hits.truncate(want);
        Ok(hits)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn ids(&self) -> Vec<u64> {
        let mut ids = self.rows.clone();
        ids.sort_unstable();
        ids
    }

    fn backend(&self) -> &'static str {
        "hnsw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FlatIndex;

    fn unit(dimension: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = 1.0;
        v
    }

    fn normalized(v: Vec<f32>) -> Vec<f32> {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.into_iter().map(|x| x / norm).collect()
    }

    fn create_artifact() -> IndexArtifact {
        let rows = (0..40u64)
            .map(|i| {
                let angle = i as f32 * 0.15;
                (i, normalized(vec![angle.cos(), angle.sin(), 0.1, 0.05 * i as f32]))
            })
            .collect();
        IndexArtifact::new(4, rows).unwrap()
    }

    #[test]
    fn test_insert_and_search() {
        let index = HnswIndex::from_artifact(create_artifact(), HnswParams::default()).unwrap();
        assert_eq!(index.len(), 40);
        assert_eq!(index.dimension(), 4);

        let query = normalized(vec![1.0, 0.0, 0.1, 0.0]);
        let hits = index.search(&query, 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, 0);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_agrees_with_flat_index_on_small_corpus() {
        let artifact = create_artifact();
        let flat = FlatIndex::from_artifact(artifact.clone()).unwrap();
        let hnsw = HnswIndex::from_artifact(artifact, HnswParams::default()).unwrap();

        // ef_search covers the whole corpus, so the graph search is exhaustive
        let query = normalized(vec![0.2, 0.9, 0.1, 0.3]);
        let expected: Vec<u64> = flat.search(&query, 5).unwrap().iter().map(|h| h.id).collect();
        let actual: Vec<u64> = hnsw.search(&query, 5).unwrap().iter().map(|h| h.id).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let artifact =
            IndexArtifact::new(3, vec![(5, unit(3, 0)), (6, unit(3, 1)), (7, unit(3, 2))])
                .unwrap();
        let index = HnswIndex::from_artifact(artifact, HnswParams::default()).unwrap();

        let hits = index.search(&unit(3, 1), 5).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, 6);
    }

    #[test]
    fn test_dimension_validation() {
        let index = HnswIndex::from_artifact(create_artifact(), HnswParams::default()).unwrap();
        assert!(matches!(
            index.search(&[1.0; 2], 1),
            Err(IndexError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_zero_params_rejected() {
        let params = HnswParams {
            m: 0,
            ..HnswParams::default()
        };
        assert!(HnswIndex::from_artifact(create_artifact(), params).is_err());
    }

    #[test]
    fn test_empty_graph() {
        let artifact = IndexArtifact::new(3, Vec::new()).unwrap();
        let index = HnswIndex::from_artifact(artifact, HnswParams::default()).unwrap();
        assert!(index.search(&unit(3, 0), 2).unwrap().is_empty());
    }
}
