use crate::log_debug;
use crate::providers::{Provider, ProviderConfig, ProviderError};

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a review session
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    /// Default LLM provider
    pub default_provider: String,
    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Review preset applied when none is given on the command line
    #[serde(default = "default_instruction_preset")]
    pub instruction_preset: String,
    /// Streaming coordinator timings
    #[serde(default)]
    pub streaming: StreamingConfig,
    /// Terminal UI behavior
    #[serde(default)]
    pub ui: UiConfig,
    /// Preset chosen for this run only (CLI override)
    #[serde(skip)]
    pub temp_preset: Option<String>,
    /// Model chosen for this run only (CLI override)
    #[serde(skip)]
    pub temp_model: Option<String>,
}

/// Timings used by the streaming coordinator
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StreamingConfig {
    /// Time allowed for trailing events after the turn completes
    pub grace_period_ms: u64,
    /// Upper bound on joining the event subscriber
    pub join_timeout_ms: u64,
    /// Delay before the single reconciliation retry
    pub reconcile_retry_delay_ms: u64,
    /// Capacity of the chunk channel
    pub chunk_buffer: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 150,
            join_timeout_ms: 1000,
            reconcile_retry_delay_ms: 250,
            chunk_buffer: 64,
        }
    }
}

impl StreamingConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn reconcile_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_retry_delay_ms)
    }
}

/// Terminal UI configuration
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UiConfig {
    /// Window in which a second `y` completes the yank chord
    pub yank_chord_timeout_ms: u64,
    /// Redraw/animation tick
    pub tick_rate_ms: u64,
    /// Submitted prompts remembered for Up/Down navigation
    pub max_prompt_history: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            yank_chord_timeout_ms: 500,
            tick_rate_ms: 80,
            max_prompt_history: 100,
        }
    }
}

impl UiConfig {
    pub fn yank_chord_timeout(&self) -> Duration {
        Duration::from_millis(self.yank_chord_timeout_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

// Default instruction preset to use
fn default_instruction_preset() -> String {
    "default".to_string()
}

impl Config {
    /// Load the configuration from the file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str(&config_content).map_err(|e| {
                anyhow!(
                    "Invalid configuration file {}: {}",
                    config_path.display(),
                    e
                )
            })?
        } else {
            Self::default()
        };

        log_debug!("Configuration loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save the configuration to the file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        log_debug!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    /// Get the path to the configuration file
    fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("revu");
        fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// The configured default provider
    pub fn provider(&self) -> Result<Provider, ProviderError> {
        self.default_provider.parse()
    }

    /// Configuration for the default provider (defaults when absent)
    pub fn provider_config(&self) -> ProviderConfig {
        let Ok(provider) = self.provider() else {
            return ProviderConfig::default();
        };
        self.providers
            .get(provider.name())
            .cloned()
            .unwrap_or_else(|| ProviderConfig::with_defaults(provider))
    }

    /// Primary model, honoring a per-run override
    pub fn effective_model(&self) -> String {
        if let Some(model) = &self.temp_model {
            return model.clone();
        }
        match self.provider() {
            Ok(provider) => self.provider_config().effective_model(provider).to_string(),
            Err(_) => String::new(),
        }
    }

    /// Cheap model used for summaries
    pub fn effective_fast_model(&self) -> String {
        match self.provider() {
            Ok(provider) => self
                .provider_config()
                .effective_fast_model(provider)
                .to_string(),
            Err(_) => String::new(),
        }
    }

    /// Check the default provider's API key
    pub fn resolve_api_key(&self) -> Result<String, ProviderError> {
        crate::providers::resolve_api_key(self.provider()?)
    }

    pub fn set_temp_preset(&mut self, preset: Option<String>) {
        self.temp_preset = preset;
    }

    pub fn set_temp_model(&mut self, model: Option<String>) {
        self.temp_model = model;
    }

    /// Get the effective preset name, preferring `temp_preset` over `instruction_preset`
    pub fn get_effective_preset_name(&self) -> &str {
        self.temp_preset
            .as_deref()
            .unwrap_or(&self.instruction_preset)
    }

    /// Switch the default provider, inserting defaults for it when needed
    pub fn set_provider(&mut self, provider: Provider) {
        self.default_provider = provider.name().to_string();
        self.providers
            .entry(provider.name().to_string())
            .or_insert_with(|| ProviderConfig::with_defaults(provider));
    }
}

impl Default for Config {
    fn default() -> Self {
        let providers = Provider::ALL
            .iter()
            .map(|p| (p.name().to_string(), ProviderConfig::with_defaults(*p)))
            .collect();

        Self {
            default_provider: Provider::default().name().to_string(),
            providers,
            instruction_preset: default_instruction_preset(),
            streaming: StreamingConfig::default(),
            ui: UiConfig::default(),
            temp_preset: None,
            temp_model: None,
        }
    }
}
