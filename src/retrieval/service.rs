//! Async front end for the retriever
//!
//! - The retriever is loaded at most once, even under concurrent first calls
//! - Embedding and search run on the blocking pool, never on a runtime worker
//! - Each call is bounded by a deadline; late results are discarded
//! - After an artifact-level fault every later call fails the same way

use super::{RetrievedDocument, Retriever};
use crate::config::Config;
use crate::error::{RagError, Result};
use crate::index::IndexError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

/// Builds the retriever; runs on a blocking thread
pub type Loader = Arc<dyn Fn() -> Result<Retriever> + Send + Sync>;

/// Recorded artifact fault, replayed on every later call
#[derive(Debug, Clone)]
enum Fault {
    DimensionMismatch { expected: usize, actual: usize },
    CorpusConsistency(String),
}

impl Fault {
    fn from_error(err: &RagError) -> Option<Self> {
        match err {
            RagError::Index(IndexError::DimensionMismatch { expected, actual }) => {
                Some(Fault::DimensionMismatch {
                    expected: *expected,
                    actual: *actual,
                })
            }
            other if other.is_fatal() => Some(Fault::CorpusConsistency(other.to_string())),
            _ => None,
        }
    }

    fn to_error(&self) -> RagError {
        match self {
            Fault::DimensionMismatch { expected, actual } => IndexError::DimensionMismatch {
                expected: *expected,
                actual: *actual,
            }
            .into(),
            Fault::CorpusConsistency(message) => RagError::CorpusConsistency(message.clone()),
        }
    }
}

pub struct RetrievalService {
    retriever: OnceCell<Arc<Retriever>>,
    loader: Loader,
    timeout: Duration,
    fault: OnceLock<Fault>,
}

impl RetrievalService {
    /// Create a service that loads lazily through `loader`
    pub fn new(loader: Loader, timeout: Duration) -> Self {
        Self {
            retriever: OnceCell::new(),
            loader,
            timeout,
            fault: OnceLock::new(),
        }
    }

    /// Create a service that loads the artifacts named by `config`
    pub fn from_config(config: Config) -> Self {
        let timeout = config.retrieval.timeout();
        let loader: Loader = Arc::new(move || Retriever::load(&config));
        Self::new(loader, timeout)
    }

    /// Wrap an already loaded retriever
    pub fn with_retriever(retriever: Retriever, timeout: Duration) -> Self {
        let retriever = Arc::new(retriever);
        let loader: Loader = Arc::new(|| -> Result<Retriever> {
            Err(RagError::Config(
                "Retriever was supplied pre-loaded".to_string(),
            ))
        });
        Self {
            retriever: OnceCell::new_with(Some(retriever)),
            loader,
            timeout,
            fault: OnceLock::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.retriever.initialized()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shared retriever, loading it on first use
    pub async fn retriever(&self) -> Result<Arc<Retriever>> {
        self.check_fault()?;

        let result = self
            .retriever
            .get_or_try_init(|| async {
                let loader = self.loader.clone();
                let retriever = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| anyhow::anyhow!("Retriever load task failed: {}", e))??;
                Ok::<_, RagError>(Arc::new(retriever))
            })
            .await;

        match result {
            Ok(retriever) => Ok(retriever.clone()),
            Err(e) => {
                self.record(&e);
                Err(e)
            }
        }
    }

    /// Retrieve the `min(k, len)` best documents for `query` within the deadline
    ///
    /// Blocking work cannot be cancelled: on timeout the task is abandoned and
    /// runs to completion on the blocking pool, its result discarded.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        self.check_fault()?;
        Retriever::validate_query(query, k)?;

        let retriever = self.retriever().await?;
        let query = query.to_string();
        let task = tokio::task::spawn_blocking(move || retriever.retrieve(&query, k));

        let result = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                warn!("Retrieval exceeded deadline of {:?}", self.timeout);
                return Err(RagError::Timeout {
                    deadline: self.timeout,
                });
            }
            Ok(Err(join_error)) => {
                return Err(anyhow::anyhow!("Retrieval task failed: {}", join_error).into());
            }
            Ok(Ok(result)) => result,
        };

        match &result {
            Ok(documents) => debug!("Retrieved {} documents", documents.len()),
            Err(e) => self.record(e),
        }
        result
    }

    fn check_fault(&self) -> Result<()> {
        match self.fault.get() {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }

    fn record(&self, err: &RagError) {
        if let Some(fault) = Fault::from_error(err) {
            error!("Artifact fault, refusing further queries: {}", err);
            let _ = self.fault.set(fault);
        }
    }
}
