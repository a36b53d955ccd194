//! Retrieval orchestration
//!
//! Joins the embedder, the similarity index and the metadata store behind a
//! single `retrieve(query, k)` call. [`Retriever`] is the synchronous core;
//! [`RetrievalService`] adds one-time loading, worker-thread dispatch and a
//! per-call deadline for async hosts.

mod retriever;
mod service;

pub use retriever::Retriever;
pub use service::{Loader, RetrievalService};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A ranked document handed to the prompt-building layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: u64,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Inner-product similarity with the query (higher is better)
    pub score: f32,
}

/// Join passages with blank lines, the form the prompt layer consumes
pub fn render_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
