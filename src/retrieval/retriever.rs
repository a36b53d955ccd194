//! Embed -> search -> resolve

use super::RetrievedDocument;
use crate::config::{expand_path, Config, RetrievalConfig};
use crate::corpus::{read_metadata, DocumentStore, MetadataArtifact};
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::{build_index, read_index, IndexArtifact, IndexError, SimilarityIndex};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Immutable retrieval state: embedder, index and metadata loaded once
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn SimilarityIndex>,
    store: DocumentStore,
}

impl Retriever {
    /// Assemble a retriever from parts without startup checks
    ///
    /// Mismatched parts surface at query time as dimension or consistency
    /// errors. Use [`Retriever::check_consistency`] to verify up front.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn SimilarityIndex>,
        store: DocumentStore,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
        }
    }

    /// Load model and artifacts named by the configuration
    ///
    /// This is the expensive step; call it once per process.
    pub fn load(config: &Config) -> Result<Self> {
        let index_path = expand_path(&config.artifacts.index_path)?;
        let metadata_path = expand_path(&config.artifacts.metadata_path)?;

        info!(
            "Loading retrieval artifacts: index={}, metadata={}",
            index_path.display(),
            metadata_path.display()
        );

        let index_artifact = read_index(&index_path)?;
        let metadata = read_metadata(&metadata_path)?;
        let embedder = create_provider(&config.embedding)?;

        Self::from_artifacts(embedder, index_artifact, metadata, &config.retrieval)
    }

    /// Build from loaded artifacts, enforcing that they belong together
    pub fn from_artifacts(
        embedder: Arc<dyn EmbeddingProvider>,
        index_artifact: IndexArtifact,
        metadata: MetadataArtifact,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        if metadata.dimension != index_artifact.dimension() {
            return Err(RagError::CorpusConsistency(format!(
                "Metadata records {} dimensions, index has {}",
                metadata.dimension,
                index_artifact.dimension()
            )));
        }

        if metadata.embedding_model != embedder.model_name() {
            warn!(
                "Corpus was embedded with {}, queries use {}",
                metadata.embedding_model,
                embedder.model_name()
            );
        }

        let store = DocumentStore::from_artifact(metadata)?;
        if store.build_id() != Some(index_artifact.build_id()) {
            return Err(RagError::CorpusConsistency(format!(
                "Index build {} does not match metadata build {:?}",
                index_artifact.build_id(),
                store.build_id()
            )));
        }

        let index = build_index(index_artifact, config)?;
        let retriever = Self::new(embedder, index, store);
        retriever.check_consistency()?;

        info!(
            "Retriever ready: {} documents, {}D, {} backend, model {}",
            retriever.len(),
            retriever.dimension(),
            retriever.index.backend(),
            retriever.embedder.model_name()
        );

        Ok(retriever)
    }

    /// Verify that the embedder matches the index and that index and
    /// metadata hold exactly the same ids
    pub fn check_consistency(&self) -> Result<()> {
        if self.embedder.dimension() != self.index.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: self.embedder.dimension(),
            }
            .into());
        }

        let index_ids = self.index.ids();
        let store_ids = self.store.ids();
        if index_ids != store_ids {
            let missing: Vec<u64> = index_ids
                .iter()
                .filter(|id| self.store.get(**id).is_none())
                .take(5)
                .copied()
                .collect();
            return Err(RagError::CorpusConsistency(format!(
                "Index holds {} ids, metadata holds {}; ids without metadata: {:?}",
                index_ids.len(),
                store_ids.len(),
                missing
            )));
        }

        Ok(())
    }

    /// Reject arguments before any work is done
    pub fn validate_query(query: &str, k: usize) -> Result<()> {
        if k < 1 {
            return Err(RagError::InvalidArgument(format!(
                "k must be at least 1, got {}",
                k
            )));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument(
                "Query text cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `min(k, len)` documents most similar to `query`, best first
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        Self::validate_query(query, k)?;

        let vector = self.embedder.embed(query)?;
        debug!("Embedded query ({}D)", vector.len());

        let hits = self.index.search(&vector, k)?;
        debug!("Index returned {} hits", hits.len());

        hits.into_iter()
            .map(|hit| {
                let document = self.store.get(hit.id).ok_or_else(|| {
                    RagError::CorpusConsistency(format!(
                        "Index returned document {} which has no metadata",
                        hit.id
                    ))
                })?;
                Ok(RetrievedDocument {
                    id: document.id,
                    content: document.content.clone(),
                    metadata: document.metadata.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn backend(&self) -> &'static str {
        self.index.backend()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}
