//! Turn runners execute one LLM exchange and commit it to the message store.

use crate::log_debug;
use crate::providers::{self, Provider};
use crate::store::{Message, MessageId, MessageStore, Role, SessionId};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rig::agent::{Agent, MultiTurnStreamItem};
use rig::client::builder::DynClientBuilder;
use rig::client::completion::CompletionModelHandle;
use rig::streaming::{StreamedAssistantContent, StreamingPrompt};
use std::fmt::Write as _;
use std::sync::Arc;

/// Extra material sent alongside the user's prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: String,
}

/// One exchange to run against a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub system_prompt: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

impl TurnRequest {
    pub fn new(
        session_id: SessionId,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.attachments.push(Attachment {
            name: name.into(),
            content: content.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The provider refused to answer
    #[error("Response withheld by the provider: {0}")]
    SafetyBlocked(String),
    #[error("Model request failed: {0}")]
    Transport(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Runs a single turn. Returns once the assistant reply is fully committed to
/// the store; the user message and the reply are both written by the runner.
#[async_trait]
pub trait TurnRunner: Send + Sync {
    async fn run(&self, request: TurnRequest) -> Result<(), TurnError>;
}

/// Prompt that asks for the initial review of the context
pub const INITIAL_REVIEW_PROMPT: &str = "Review the changes above. Point out concrete problems with \
     file and line references, then suggest improvements.";

const MAX_RESPONSE_TOKENS: u64 = 8192;

const SAFETY_MARKERS: &[&str] = &["safety", "content_filter", "content filter", "refus", "blocked"];

/// Runner backed by rig's dynamic provider client
pub struct RigTurnRunner {
    provider: Provider,
    model: String,
    store: Arc<dyn MessageStore>,
}

impl RigTurnRunner {
    pub fn new(provider: Provider, model: impl Into<String>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            provider,
            model: model.into(),
            store,
        }
    }

    /// Build the agent synchronously; the builder is not `Send`
    fn build_agent(
        &self,
        system_prompt: &str,
    ) -> Result<Agent<CompletionModelHandle<'static>>, TurnError> {
        let agent = DynClientBuilder::new()
            .agent(self.provider.client_name(), &self.model)
            .map_err(|e| TurnError::Config(format!("Failed to create agent: {e}")))?
            .preamble(system_prompt)
            .max_tokens(MAX_RESPONSE_TOKENS)
            .build();
        Ok(agent)
    }
}

/// Render earlier turns and attachments into the text sent to the model
pub fn render_turn_prompt(history: &[Message], request: &TurnRequest) -> String {
    let mut out = String::new();

    if !history.is_empty() {
        out.push_str("Conversation so far:\n");
        for message in history {
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "Reviewer",
            };
            let _ = writeln!(out, "\n{speaker}:\n{}", message.content.trim_end());
        }
        out.push_str("\n---\n\n");
    }

    for attachment in &request.attachments {
        let _ = writeln!(
            out,
            "Attachment `{}`:\n```\n{}\n```\n",
            attachment.name,
            attachment.content.trim_end()
        );
    }

    out.push_str(&request.prompt);
    out
}

fn classify_failure(message: String) -> TurnError {
    let lower = message.to_lowercase();
    if SAFETY_MARKERS.iter().any(|m| lower.contains(m)) {
        TurnError::SafetyBlocked(message)
    } else {
        TurnError::Transport(message)
    }
}

#[async_trait]
impl TurnRunner for RigTurnRunner {
    async fn run(&self, request: TurnRequest) -> Result<(), TurnError> {
        providers::resolve_api_key(self.provider).map_err(|e| TurnError::Config(e.to_string()))?;

        let session = request.session_id;
        let history = self
            .store
            .list(session)
            .await
            .map_err(|e| TurnError::Transport(e.to_string()))?;
        let prompt = render_turn_prompt(&history, &request);
        let agent = self.build_agent(&request.system_prompt)?;

        self.store
            .append(session, Role::User, request.prompt.clone(), true)
            .await
            .map_err(|e| TurnError::Transport(e.to_string()))?;
        let reply = self
            .store
            .append(session, Role::Assistant, String::new(), false)
            .await
            .map_err(|e| TurnError::Transport(e.to_string()))?;

        log_debug!(
            "Running turn on {} ({}), prompt {} chars",
            self.provider,
            self.model,
            prompt.len()
        );

        let stream = agent.stream_prompt(prompt).await;
        let deltas = stream.filter_map(|item| async move {
            match item {
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(
                    text,
                ))) => Some(Ok(text.text)),
                Ok(_) => None,
                Err(e) => Some(Err(classify_failure(e.to_string()))),
            }
        });
        let text = write_deltas(self.store.as_ref(), session, reply.id, deltas).await?;
        log_debug!("Turn finished, {} chars", text.len());
        Ok(())
    }
}

/// Grow the reply message with each text delta, then mark it finished.
///
/// Every update carries the full text so far. Returns the complete reply.
pub async fn write_deltas<S>(
    store: &dyn MessageStore,
    session: SessionId,
    reply: MessageId,
    deltas: S,
) -> Result<String, TurnError>
where
    S: Stream<Item = Result<String, TurnError>> + Send,
{
    let transport = |e: crate::store::StoreError| TurnError::Transport(e.to_string());
    let mut deltas = std::pin::pin!(deltas);
    let mut text = String::new();

    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if delta.is_empty() {
            continue;
        }
        text.push_str(&delta);
        store
            .update(session, reply, text.clone(), false)
            .await
            .map_err(transport)?;
    }

    store
        .update(session, reply, text.clone(), true)
        .await
        .map_err(transport)?;
    Ok(text)
}
