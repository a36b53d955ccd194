//! Corpus documents and the metadata artifact
//!
//! The metadata artifact maps document ids to passage text and opaque source
//! attributes. It is written in lock-step with the index artifact and carries
//! the same build id.

mod store;

pub use store::{read_metadata, write_metadata, DocumentStore, MetadataArtifact};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable id shared with the index row
    pub id: u64,
    /// Passage text, returned verbatim
    pub content: String,
    /// Source attributes (url, title, ...), passed through unchanged
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
