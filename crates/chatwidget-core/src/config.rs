use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "CHATWIDGET_API_KEY";

/// Keys starting with this prefix are treated as "not configured".
const PLACEHOLDER_KEY_PREFIX: &str = "sk-your";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub rate_limit: RateLimitSettings,
    pub response: ResponseSettings,
    pub completion: CompletionSettings,
    /// Size of the history window kept by a session.
    pub max_stored_messages: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_messages: usize,
    pub window_ms: u64,
    pub cooldown_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ResponseSettings {
    pub max_length: usize,
    pub min_thinking_ms: u64,
    pub max_thinking_ms: u64,
    pub words_per_ms: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CompletionSettings {
    pub enabled: bool,
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitSettings::default(),
            response: ResponseSettings::default(),
            completion: CompletionSettings::default(),
            max_stored_messages: 50,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_messages: 10,
            window_ms: 60_000,
            cooldown_ms: 30_000,
        }
    }
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            max_length: 500,
            min_thinking_ms: 800,
            max_thinking_ms: 2500,
            words_per_ms: 0.05,
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: "sk-your-api-key-here".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            timeout_ms: 15_000,
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

impl CompletionSettings {
    /// True when the service is switched on and holds a real credential.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        self.enabled && !key.is_empty() && !key.starts_with(PLACEHOLDER_KEY_PREFIX)
    }

    /// Key with everything but the last four characters hidden.
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the per-user config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::new()
        };

        Ok(config.with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {:?}: {}", path, e))?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// An env-provided key wins over the stored one; blank values are ignored.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.completion.api_key = key;
        }
        self
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatwidget").join("config.json"))
    }
}
