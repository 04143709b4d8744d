//! The collaborators a review session talks to.

use crate::config::Config;
use crate::providers::ProviderError;
use crate::runner::{RigTurnRunner, TurnRunner};
use crate::store::{MemoryStore, MessageStore};
use crate::summarizer::{RigSummarizer, Summarizer};

use std::sync::Arc;

/// Message store, turn runner and summarizer, plus the configuration they were built from
#[derive(Clone)]
pub struct Backend {
    pub config: Config,
    pub store: Arc<dyn MessageStore>,
    pub runner: Arc<dyn TurnRunner>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl Backend {
    /// rig-backed runner and summarizer over an in-memory store
    pub fn from_config(config: Config) -> Result<Self, ProviderError> {
        let provider = config.provider()?;
        let store: Arc<dyn MessageStore> = Arc::new(MemoryStore::new());
        let runner = Arc::new(RigTurnRunner::new(
            provider,
            config.effective_model(),
            Arc::clone(&store),
        ));
        let summarizer = Arc::new(RigSummarizer::new(provider, config.effective_fast_model()));

        Ok(Self {
            config,
            store,
            runner,
            summarizer,
        })
    }

    /// Assemble a backend from explicit parts
    pub fn new(
        config: Config,
        store: Arc<dyn MessageStore>,
        runner: Arc<dyn TurnRunner>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            store,
            runner,
            summarizer,
        }
    }

    pub fn model(&self) -> String {
        self.config.effective_model()
    }
}
