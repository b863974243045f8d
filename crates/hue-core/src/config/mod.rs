//! Configuration management for Hue.
//!
//! Configuration is read from a TOML file (explicit path or the platform
//! config directory) with sensible defaults for every section. A missing
//! file is not an error: the built-in prompt set and Gemini defaults apply.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration structure for Hue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request settings shared by every provider
    pub api: ApiConfig,

    /// Where images live and which ones a batch picks up
    pub images: ImagesConfig,

    /// Named prompt templates
    pub prompts: PromptsConfig,

    /// Result persistence settings
    pub output: OutputConfig,

    /// Timing and pacing settings
    pub performance: PerformanceConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Provider-specific settings
    pub provider: ProviderConfig,

    /// File this configuration was loaded from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit path when given, otherwise from the default location.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_from(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.hue.hue/config.toml
    /// - Linux: ~/.config/hue/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\hue\config\config.toml
    ///
    /// Falls back to ~/.hue/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "hue", "hue")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".hue").join("config.toml")
            })
    }

    /// Resolved image directory (with ~ expansion).
    pub fn image_dir(&self) -> PathBuf {
        expand(&self.images.directory)
    }

    /// Resolved results directory (with ~ expansion).
    pub fn results_dir(&self) -> PathBuf {
        expand(&self.output.directory)
    }

    /// Text of the named prompt, or of the default prompt when `name` is `None`.
    pub fn prompt_text(&self, name: Option<&str>) -> Option<&str> {
        let name = name.unwrap_or(&self.prompts.default);
        self.prompts.available.get(name).map(|p| p.text.as_str())
    }

    /// All prompts, ordered by name.
    pub fn available_prompts(&self) -> &BTreeMap<String, PromptTemplate> {
        &self.prompts.available
    }

    /// Prompt names in listing order.
    pub fn prompt_names(&self) -> Vec<String> {
        self.prompts.available.keys().cloned().collect()
    }

    /// Batch result file name for the given timestamp.
    pub fn results_filename(&self, timestamp: &str) -> String {
        self.output.filename.replace("{timestamp}", timestamp)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

/// Current local time formatted for result file names (`YYYYmmdd_HHMMSS`).
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
