use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const ASSEMBLY_API_KEY_ENV: &str = "RECAP_ASSEMBLY_API_KEY";
pub const LLM_API_KEY_ENV: &str = "RECAP_LLM_API_KEY";
pub const CONDENSER_API_KEY_ENV: &str = "RECAP_CONDENSER_API_KEY";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub llm: LlmConfig,
    pub condenser: CondenserConfig,
    pub memory: MemoryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub poll_interval_secs: u64,
    /// Upper bound on how long a single job may be polled. `None` polls forever.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenserConfig {
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub min_length: usize,
    pub max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of prior meetings folded into the context window
    pub context_limit: usize,
    pub history_path: Option<String>,
    pub transcripts_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: "https://api.assemblyai.com/v2".to_string(),
            poll_interval_secs: 3,
            timeout_secs: Some(3600),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: "https://openrouter.ai/api/v1".to_string(),
            model: "mistralai/mistral-7b-instruct".to_string(),
            temperature: 0.3,
            max_tokens: 500,
        }
    }
}

impl Default for CondenserConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint:
                "https://api-inference.huggingface.co/models/sshleifer/distilbart-cnn-12-6"
                    .to_string(),
            min_length: 30,
            max_length: 150,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            context_limit: 2,
            history_path: None,
            transcripts_dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
            info!("Loaded config from {:?}", config_path);
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Secrets from the environment win over the file so keys never need to be written to disk.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ASSEMBLY_API_KEY_ENV) {
            self.transcription.api_key = Some(key);
        }
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            self.llm.api_key = Some(key);
        }
        if let Ok(key) = std::env::var(CONDENSER_API_KEY_ENV) {
            self.condenser.api_key = Some(key);
        }
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.memory.history_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => global::history_file(),
        }
    }

    pub fn transcripts_dir(&self) -> Result<PathBuf> {
        match &self.memory.transcripts_dir {
            Some(path) => Ok(PathBuf::from(path)),
            None => global::transcripts_dir(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
