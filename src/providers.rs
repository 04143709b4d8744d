//! LLM provider definitions.
//!
//! Which providers a review session can talk to, their default models, and
//! how an API key is found for each of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Anthropic,
    Google,
}

impl Provider {
    /// All available providers
    pub const ALL: &'static [Provider] = &[Provider::OpenAI, Provider::Anthropic, Provider::Google];

    /// Provider name as used in config files and CLI
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }

    /// Provider name understood by rig's dynamic client builder
    pub const fn client_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "gemini",
        }
    }

    /// Model used for the review transcript and follow-up questions
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-5.1",
            Self::Anthropic => "claude-sonnet-4-5-20250929",
            Self::Google => "gemini-3-pro-preview",
        }
    }

    /// Cheaper model used to summarize pruned files
    pub const fn default_fast_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-5.1-mini",
            Self::Anthropic => "claude-haiku-4-5-20251001",
            Self::Google => "gemini-2.5-flash",
        }
    }

    /// Context window size (max tokens)
    pub const fn context_window(&self) -> usize {
        match self {
            Self::OpenAI => 128_000,
            Self::Anthropic => 200_000,
            Self::Google => 1_000_000,
        }
    }

    /// Environment variable consulted when no key is configured
    pub const fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Google => "GEMINI_API_KEY",
        }
    }

    /// Get all provider names as strings
    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::name).collect()
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let normalized = match lower.as_str() {
            "claude" => "anthropic",
            "gemini" => "google",
            other => other,
        };

        Self::ALL
            .iter()
            .find(|p| p.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Provider configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}. Supported: openai, anthropic, google")]
    Unknown(String),
    #[error("API key required for provider {provider} (set ${env})")]
    MissingApiKey { provider: String, env: String },
}

/// Per-provider configuration
///
/// API keys are never stored here. rig's dynamic client builder reads them from
/// the provider's environment variable, so that is the only place they live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Primary model for the review transcript
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Cheap model for file summaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_model: Option<String>,
}

impl ProviderConfig {
    /// Create config with defaults for a provider
    pub fn with_defaults(provider: Provider) -> Self {
        Self {
            model: provider.default_model().to_string(),
            fast_model: Some(provider.default_fast_model().to_string()),
        }
    }

    /// Get effective model (configured or default)
    pub fn effective_model(&self, provider: Provider) -> &str {
        if self.model.is_empty() {
            provider.default_model()
        } else {
            &self.model
        }
    }

    /// Get effective fast model (configured or default)
    pub fn effective_fast_model(&self, provider: Provider) -> &str {
        self.fast_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| provider.default_fast_model())
    }
}

/// Check that the provider's API key is present in the environment
pub fn resolve_api_key(provider: Provider) -> Result<String, ProviderError> {
    resolve_api_key_with(provider, |name| std::env::var(name).ok())
}

/// Same as [`resolve_api_key`] with an injectable variable lookup
pub fn resolve_api_key_with(
    provider: Provider,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ProviderError> {
    let env = provider.api_key_env();
    match lookup(env) {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ProviderError::MissingApiKey {
            provider: provider.name().to_string(),
            env: env.to_string(),
        }),
    }
}
