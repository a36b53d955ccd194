//! Offline corpus build
//!
//! Reads a JSON Lines corpus, embeds every passage and writes the index and
//! metadata artifacts together under one build id.

use crate::corpus::{write_metadata, Document, MetadataArtifact};
use crate::embedding::{BatchEmbedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::{write_index, IndexArtifact};
use ahash::AHashSet;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One corpus line
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusRecord {
    /// Assigned from the record position when absent
    #[serde(default)]
    pub id: Option<u64>,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Read a JSON Lines corpus file
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let text = fs::read_to_string(path).map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to read corpus: {}", path.display()),
    })?;

    parse_corpus(&text).map_err(|message| RagError::Artifact {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse JSON Lines corpus text; errors name the offending line
pub fn parse_corpus(text: &str) -> std::result::Result<Vec<Document>, String> {
    let mut documents = Vec::new();
    let mut seen = AHashSet::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: CorpusRecord =
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", line_no, e))?;

        if record.content.trim().is_empty() {
            return Err(format!("line {}: content is empty", line_no));
        }

        let id = record.id.unwrap_or(documents.len() as u64);
        if !seen.insert(id) {
            return Err(format!("line {}: duplicate document id {}", line_no, id));
        }

        documents.push(Document {
            id,
            content: record.content,
            metadata: record.metadata,
        });
    }

    Ok(documents)
}

/// Result of a completed build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub build_id: Uuid,
    pub documents: usize,
    pub dimension: usize,
    pub embedding_model: String,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Embeds a corpus and produces matching index and metadata artifacts
pub struct IndexBuilder {
    embedder: BatchEmbedder,
}

impl IndexBuilder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            embedder: BatchEmbedder::new(provider, batch_size),
        }
    }

    /// Embed `documents` and pair the vectors with their metadata
    pub fn build(&self, documents: Vec<Document>) -> Result<(IndexArtifact, MetadataArtifact)> {
        let (index, metadata, _) = self.build_inner(documents)?;
        Ok((index, metadata))
    }

    /// Build and write both artifacts
    pub fn write(
        &self,
        documents: Vec<Document>,
        index_path: &Path,
        metadata_path: &Path,
    ) -> Result<BuildSummary> {
        let (index, metadata, summary) = self.build_inner(documents)?;

        // A half-written pair has mismatched build ids and is refused at load
        write_metadata(metadata_path, &metadata)?;
        write_index(index_path, &index)?;

        info!(
            "Wrote build {}: index={}, metadata={}",
            summary.build_id,
            index_path.display(),
            metadata_path.display()
        );

        Ok(summary)
    }

    fn build_inner(
        &self,
        documents: Vec<Document>,
    ) -> Result<(IndexArtifact, MetadataArtifact, BuildSummary)> {
        if documents.is_empty() {
            warn!("Building an empty corpus; every query will return no documents");
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embedded = self.embedder.embed_all(&texts)?;

        let dimension = self.embedder.dimension();
        let build_id = Uuid::new_v4();
        let rows = documents
            .iter()
            .map(|d| d.id)
            .zip(embedded.vectors)
            .collect();

        let index = IndexArtifact::with_build_id(dimension, build_id, rows)?;
        let summary = BuildSummary {
            build_id,
            documents: documents.len(),
            dimension,
            embedding_model: self.embedder.model_name().to_string(),
            batches: embedded.batches,
            duration_ms: embedded.duration_ms,
        };
        let metadata =
            MetadataArtifact::new(build_id, self.embedder.model_name(), dimension, documents);

        Ok((index, metadata, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::read_metadata;
    use crate::embedding::HashingEmbedder;
    use crate::index::read_index;
    use tempfile::TempDir;

    const CORPUS: &str = r#"{"content": "UALR library hours are 9-5", "metadata": {"source": "https://ualr.edu/library/"}}

{"content": "Financial aid office: finaid@ualr.edu"}
{"id": 7, "content": "Parking permits cost $50"}
"#;

    fn builder() -> IndexBuilder {
        IndexBuilder::new(Arc::new(HashingEmbedder::new(384, 256).unwrap()), 2)
    }

    #[test]
    fn test_parse_assigns_ids() {
        let documents = parse_corpus(CORPUS).unwrap();
        let ids: Vec<u64> = documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0, 1, 7]);
        assert_eq!(
            documents[0].metadata["source"],
            "https://ualr.edu/library/"
        );
        assert!(documents[1].metadata.is_empty());
    }

    #[test]
    fn test_parse_rejects_duplicate_ids() {
        let text = "{\"id\": 1, \"content\": \"a\"}\n{\"content\": \"b\"}\n";
        let err = parse_corpus(text).unwrap_err();
        assert!(err.contains("line 2"));
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_parse_rejects_empty_content() {
        let err = parse_corpus("{\"content\": \"   \"}").unwrap_err();
        assert!(err.starts_with("line 1"));
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        let err = parse_corpus("{\"content\": \"ok\"}\nnot json\n").unwrap_err();
        assert!(err.starts_with("line 2"));
    }

    #[test]
    fn test_build_shares_build_id() {
        let documents = parse_corpus(CORPUS).unwrap();
        let (index, metadata) = builder().build(documents).unwrap();

        assert_eq!(index.build_id(), metadata.build_id);
        assert_eq!(index.dimension(), 384);
        assert_eq!(metadata.dimension, 384);
        assert_eq!(metadata.embedding_model, "hashing-384");
        assert_eq!(index.ids(), &[0, 1, 7]);
        assert_eq!(metadata.documents.len(), 3);
    }

    #[test]
    fn test_write_round_trip() {
        let temp = TempDir::new().unwrap();
        let corpus_path = temp.path().join("corpus.jsonl");
        fs::write(&corpus_path, CORPUS).unwrap();

        let index_path = temp.path().join("out/corpus.idx");
        let metadata_path = temp.path().join("out/doc_metadata.json.zst");

        let documents = load_corpus(&corpus_path).unwrap();
        let summary = builder()
            .write(documents, &index_path, &metadata_path)
            .unwrap();

        assert_eq!(summary.documents, 3);
        assert_eq!(summary.batches, 2);

        let index = read_index(&index_path).unwrap();
        let metadata = read_metadata(&metadata_path).unwrap();
        assert_eq!(index.build_id(), summary.build_id);
        assert_eq!(metadata.build_id, summary.build_id);
    }

    #[test]
    fn test_load_missing_corpus() {
        let temp = TempDir::new().unwrap();
        let err = load_corpus(&temp.path().join("missing.jsonl")).unwrap_err();
        assert!(matches!(err, RagError::Io { .. }));
    }
}
