//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Request settings shared by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Provider used when none is given on the command line ("gemini" or "openai")
    pub provider: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Base delay between retries in milliseconds (doubled per attempt)
    pub retry_delay_ms: u64,

    /// Maximum requests in flight during a batch
    pub parallel: usize,

    /// Maximum tokens the model may generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1000,
            parallel: 1,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Image selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Directory the batch reads from (and single-image names resolve against)
    pub directory: PathBuf,

    /// File names or wildcard patterns relative to `directory`
    pub files: Vec<String>,

    /// Accepted file extensions
    pub supported_formats: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./images"),
            files: vec!["*".to_string()],
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
            ],
        }
    }
}

/// A named prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptTemplate {
    /// One-line summary shown by `--list-prompts`
    #[serde(default)]
    pub description: String,

    /// Text sent to the model alongside the image
    pub text: String,
}

impl PromptTemplate {
    pub fn new(description: &str, text: &str) -> Self {
        Self {
            description: description.to_string(),
            text: text.to_string(),
        }
    }
}

/// Prompt set and the default selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt used when none is requested
    pub default: String,

    /// Prompts by name
    pub available: BTreeMap<String, PromptTemplate>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        let mut available = BTreeMap::new();
        available.insert(
            "color_detection_speed".to_string(),
            PromptTemplate::new(
                "Fast single-word text color recognition",
                "Name the color of the text as quickly as possible. \
                 Uncertainty is acceptable. Reply with a single word and nothing else.",
            ),
        );
        available.insert(
            "color_detection_accurate".to_string(),
            PromptTemplate::new(
                "Careful text color recognition",
                "Look carefully at the text in this image and name its color. \
                 Reply with a single color word and nothing else.",
            ),
        );
        available.insert(
            "color_description".to_string(),
            PromptTemplate::new(
                "Dominant colors of the whole image",
                "List the dominant colors in this image, most prominent first, \
                 as a comma-separated list of color names.",
            ),
        );
        available.insert(
            "scene_description".to_string(),
            PromptTemplate::new(
                "Short scene description",
                "Describe this image in one sentence.",
            ),
        );

        Self {
            default: "color_detection_speed".to_string(),
            available,
        }
    }
}

/// Result persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory results are written to
    pub directory: PathBuf,

    /// Batch result file name template; `{timestamp}` is substituted
    pub filename: String,

    /// Pretty-print JSON result files
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./results"),
            filename: "batch_results_{timestamp}.json".to_string(),
            pretty: true,
        }
    }
}

/// Timing and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Record request timings on each result
    pub enable_timing: bool,

    /// Timing mode when not given on the command line ("standard" or "precise")
    pub timing_mode: String,

    /// Write every result to its own JSON file as well
    pub save_individual_results: bool,

    /// Pause after each batch request, in milliseconds
    pub request_delay_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_timing: true,
            timing_mode: "standard".to_string(),
            save_individual_results: false,
            request_delay_ms: 500,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum image file size in megabytes
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 20,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Google Gemini configuration
    pub gemini: GeminiConfig,

    /// OpenAI-compatible Chat Completions configuration
    pub openai: OpenAiConfig,
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API base URL (the `models/...` path is appended)
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GOOGLE_API_KEY}".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

/// OpenAI-compatible configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Chat Completions URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}
