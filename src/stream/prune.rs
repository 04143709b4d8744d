//! Per-file summarization for pruning large files out of the prompt.
//!
//! Each file runs independently under its own cancel handle. Results are
//! returned to the caller; the pruned-file map itself is only ever updated
//! by the studio reducer.

use super::cancel::CancelHandle;
use crate::summarizer::Summarizer;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PruneError {
    #[error("Pruning cancelled")]
    Cancelled,
    #[error("No API key for {provider}; set it to prune files")]
    MissingCredential { provider: String },
    #[error("Unknown file: {0}")]
    UnknownFile(String),
    #[error("Summary failed: {0}")]
    Model(String),
}

impl PruneError {
    /// Cancellation is reported to the user as information, not as a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub struct PruneCoordinator {
    summarizer: Arc<dyn Summarizer>,
    root: CancellationToken,
}

impl PruneCoordinator {
    pub fn new(summarizer: Arc<dyn Summarizer>, root: CancellationToken) -> Self {
        Self { summarizer, root }
    }

    /// A fresh handle for one file, cancelled along with the root
    pub fn handle(&self) -> CancelHandle {
        CancelHandle::child_of(&self.root)
    }

    /// Summarize one file, stopping early when `cancel` fires
    pub async fn prune(
        &self,
        path: &str,
        content: &str,
        cancel: &CancelHandle,
    ) -> Result<String, PruneError> {
        if cancel.is_cancelled() {
            return Err(PruneError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            () = cancel.token().cancelled() => Err(PruneError::Cancelled),
            summary = self.summarizer.summarize(path, content) => summary,
        };

        match &result {
            Ok(summary) => debug!(path, chars = summary.len(), "file pruned"),
            Err(e) => debug!(path, "prune ended: {e}"),
        }
        result
    }
}
