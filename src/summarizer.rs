//! One-sentence file summaries from the provider's fast model.

use crate::log_debug;
use crate::providers::{self, Provider};
use crate::stream::PruneError;

use async_trait::async_trait;
use rig::client::builder::DynClientBuilder;
use rig::completion::Prompt;

const SUMMARY_MAX_TOKENS: u64 = 120;

/// Content beyond this many bytes is cut before summarizing
const MAX_INPUT_BYTES: usize = 48_000;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, path: &str, content: &str) -> Result<String, PruneError>;
}

pub struct RigSummarizer {
    provider: Provider,
    fast_model: String,
}

impl RigSummarizer {
    pub fn new(provider: Provider, fast_model: impl Into<String>) -> Self {
        Self {
            provider,
            fast_model: fast_model.into(),
        }
    }

    fn build_agent(
        &self,
    ) -> Result<rig::agent::Agent<impl rig::completion::CompletionModel + 'static>, PruneError> {
        let agent = DynClientBuilder::new()
            .agent(self.provider.client_name(), &self.fast_model)
            .map_err(|e| PruneError::Model(format!("Failed to create summary agent: {e}")))?
            .preamble(
                "You summarize source files for a code reviewer. \
                 Reply with exactly one sentence describing what the file does. \
                 No preamble, no markdown.",
            )
            .max_tokens(SUMMARY_MAX_TOKENS)
            .build();
        Ok(agent)
    }
}

/// Cut `content` to at most `max` bytes on a char boundary
fn truncate_input(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

/// Reduce a model reply to a single sentence on one line
pub fn one_sentence(reply: &str) -> String {
    let flat = reply.split_whitespace().collect::<Vec<_>>().join(" ");
    let flat = flat.trim_matches(|c| c == '"' || c == '`');
    match flat.find(". ") {
        Some(idx) => flat[..=idx].to_string(),
        None => flat.to_string(),
    }
}

#[async_trait]
impl Summarizer for RigSummarizer {
    async fn summarize(&self, path: &str, content: &str) -> Result<String, PruneError> {
        providers::resolve_api_key(self.provider).map_err(|_| PruneError::MissingCredential {
            provider: self.provider.name().to_string(),
        })?;

        let agent = self.build_agent()?;
        let prompt = format!(
            "File `{path}`:\n```\n{}\n```",
            truncate_input(content, MAX_INPUT_BYTES)
        );
        log_debug!("Summarizing {} with {}", path, self.fast_model);

        let reply = agent
            .prompt(&prompt)
            .await
            .map_err(|e| PruneError::Model(e.to_string()))?;

        let summary = one_sentence(&reply);
        if summary.is_empty() {
            return Err(PruneError::Model("empty summary".to_string()));
        }
        Ok(summary)
    }
}
