//! Metadata artifact persistence and the in-memory id -> document table

use super::Document;
use crate::error::{RagError, Result};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const FORMAT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

/// Serialized form of the metadata table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataArtifact {
    pub format_version: u32,
    /// Must equal the build id of the index artifact
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub embedding_model: String,
    pub dimension: usize,
    pub documents: Vec<Document>,
}

impl MetadataArtifact {
    pub fn new(
        build_id: Uuid,
        embedding_model: impl Into<String>,
        dimension: usize,
        documents: Vec<Document>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            build_id,
            created_at: Utc::now(),
            embedding_model: embedding_model.into(),
            dimension,
            documents,
        }
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

/// Write the metadata artifact as JSON, zstd-compressed for `.zst` paths
pub fn write_metadata(path: &Path, artifact: &MetadataArtifact) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to create metadata directory: {}", parent.display()),
        })?;
    }

    let json = serde_json::to_vec(artifact).map_err(|e| RagError::Json {
        source: e,
        context: "Failed to serialize metadata artifact".to_string(),
    })?;

    let bytes = if is_compressed(path) {
        zstd::encode_all(&json[..], ZSTD_LEVEL).map_err(|e| RagError::Io {
            source: e,
            context: "Failed to compress metadata artifact".to_string(),
        })?
    } else {
        json
    };

    // Write to temporary file first (atomic write)
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to create temp metadata file: {}", temp_path.display()),
    })?;
    file.write_all(&bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write metadata file: {}", temp_path.display()),
        })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| RagError::Io {
        source: e,
        context: format!(
            "Failed to rename temp metadata to final location: {} -> {}",
            temp_path.display(),
            path.display()
        ),
    })?;

    Ok(())
}

/// Read a metadata artifact written by [`write_metadata`]
pub fn read_metadata(path: &Path) -> Result<MetadataArtifact> {
    let raw = fs::read(path).map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to read metadata file: {}", path.display()),
    })?;

    let json = if is_compressed(path) {
        zstd::decode_all(&raw[..]).map_err(|e| RagError::Artifact {
            path: path.to_path_buf(),
            message: format!("zstd decode failed: {}", e),
        })?
    } else {
        raw
    };

    let artifact: MetadataArtifact =
        serde_json::from_slice(&json).map_err(|e| RagError::Artifact {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if artifact.format_version != FORMAT_VERSION {
        return Err(RagError::Artifact {
            path: path.to_path_buf(),
            message: format!("Unsupported format version {}", artifact.format_version),
        });
    }

    Ok(artifact)
}

/// Immutable id -> document table
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: AHashMap<u64, Document>,
    build_id: Option<Uuid>,
}

impl DocumentStore {
    /// Build a store, rejecting duplicate ids
    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        let mut table = AHashMap::with_capacity(documents.len());
        for document in documents {
            let id = document.id;
            if table.insert(id, document).is_some() {
                return Err(RagError::CorpusConsistency(format!(
                    "Duplicate document id {} in metadata",
                    id
                )));
            }
        }
        Ok(Self {
            documents: table,
            build_id: None,
        })
    }

    pub fn from_artifact(artifact: MetadataArtifact) -> Result<Self> {
        let build_id = artifact.build_id;
        let mut store = Self::from_documents(artifact.documents)?;
        store.build_id = Some(build_id);
        Ok(store)
    }

    pub fn get(&self, id: u64) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Build id recorded in the artifact, if loaded from one
    pub fn build_id(&self) -> Option<Uuid> {
        self.build_id
    }

    /// Every document id, ascending
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.documents.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_documents() -> Vec<Document> {
        vec![
            Document::new(0, "UALR library hours are 9-5")
                .with_metadata("url", "https://ualr.edu/library/"),
            Document::new(1, "Financial aid office: finaid@ualr.edu"),
            Document::new(2, "Parking permits cost $50").with_metadata("title", "Parking"),
        ]
    }

    #[test]
    fn test_write_and_read_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc_metadata.json");
        let build_id = Uuid::new_v4();
        let artifact = MetadataArtifact::new(build_id, "all-MiniLM-L6-v2", 384, sample_documents());

        write_metadata(&path, &artifact).unwrap();
        let loaded = read_metadata(&path).unwrap();

        assert_eq!(loaded.build_id, build_id);
        assert_eq!(loaded.dimension, 384);
        assert_eq!(loaded.documents, sample_documents());
    }

    #[test]
    fn test_write_and_read_compressed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc_metadata.json.zst");
        let artifact = MetadataArtifact::new(Uuid::new_v4(), "hashing-64", 64, sample_documents());

        write_metadata(&path, &artifact).unwrap();

        // Compressed bytes are not plain JSON
        let raw = fs::read(&path).unwrap();
        assert!(serde_json::from_slice::<MetadataArtifact>(&raw).is_err());

        let store = DocumentStore::from_artifact(read_metadata(&path).unwrap()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.build_id(), Some(artifact.build_id));
        assert_eq!(
            store.get(0).unwrap().metadata["url"],
            "https://ualr.edu/library/"
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let documents = vec![Document::new(4, "first"), Document::new(4, "second")];
        let err = DocumentStore::from_documents(documents).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_garbage_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc_metadata.json");
        fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            read_metadata(&path),
            Err(RagError::Artifact { .. })
        ));
    }

    #[test]
    fn test_ids_sorted() {
        let store = DocumentStore::from_documents(vec![
            Document::new(9, "nine"),
            Document::new(2, "two"),
        ])
        .unwrap();
        assert_eq!(store.ids(), vec![2, 9]);
        assert!(store.get(5).is_none());
        assert_eq!(store.build_id(), None);
    }

    #[test]
    fn test_metadata_passthrough_json_shape() {
        let json = r#"{"id": 3, "content": "Campus map", "metadata": {"url": "https://ualr.edu/map", "tags": ["maps", 1]}}"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.metadata["tags"][1], 1);

        let bare: Document = serde_json::from_str(r#"{"id": 4, "content": "No metadata"}"#).unwrap();
        assert!(bare.metadata.is_empty());
    }
}
