//! Vision provider trait and request/response types.
//!
//! Defines the interface every backend implements, plus the factory that
//! builds the right provider from CLI flags and config.

use crate::config::ProviderConfig;
use crate::error::AnalysisError;
use crate::pipeline::validate::{media_type_for_extension, sniff_media_type};
use async_trait::async_trait;
use base64::Engine;
use std::path::Path;
use std::time::Duration;

use super::timing::{RequestTimings, TimingMode};

/// Base64-encoded image ready to send to a provider.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Encode raw image bytes.
    ///
    /// The MIME type comes from the header bytes, then the file extension,
    /// then defaults to JPEG.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Self {
        let media_type = sniff_media_type(bytes)
            .or_else(|| media_type_for_extension(path))
            .unwrap_or_else(|| {
                tracing::warn!("Unknown image format for {:?}, defaulting to image/jpeg", path);
                "image/jpeg"
            });

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to analyze one image with one prompt.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// The image to analyze
    pub image: ImageInput,
    /// Prompt text
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// How much timing detail to record
    pub timing_mode: TimingMode,
}

/// The response from a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Generated text, trimmed
    pub text: String,
    /// Model identifier reported by the provider (or the configured one)
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// HTTP status of the successful response
    pub http_status: u16,
    /// Timing of the HTTP exchange
    pub timings: RequestTimings,
}

/// Trait that all vision providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn VisionProvider>` for dynamic dispatch).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name for logging (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Model the provider sends requests to.
    fn model(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Send one image + prompt and return the model's answer.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ProviderResponse, AnalysisError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Environment variable a provider reads its key from by default.
pub fn api_key_env_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some("GOOGLE_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

/// Map a transport-level failure into a provider error.
///
/// Timeouts and connection failures are worded so retry classification
/// picks them up without an HTTP status.
pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> AnalysisError {
    let message = if e.is_timeout() {
        format!("{provider} request timed out: {e}")
    } else if e.is_connect() {
        format!("{provider} connect error: {e}")
    } else {
        format!("{provider} request failed: {e}")
    };
    AnalysisError::Provider {
        message,
        status_code: None,
    }
}

/// Options passed to the factory beyond the config file.
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides<'a> {
    /// Model name that replaces the configured one
    pub model: Option<&'a str>,
    /// API key that replaces the configured one (session-only)
    pub api_key: Option<&'a str>,
    /// Request timeout
    pub timeout: Option<Duration>,
}

/// Factory that creates the appropriate provider from CLI flags and config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Known provider identifiers.
    pub const PROVIDERS: &'static [&'static str] = &["gemini", "openai"];

    /// Create a provider by name.
    ///
    /// Fails when the name is unknown or the provider's API key cannot be
    /// resolved from the override, the config or the environment.
    pub fn create(
        provider: &str,
        config: &ProviderConfig,
        overrides: ProviderOverrides<'_>,
    ) -> Result<Box<dyn VisionProvider>, AnalysisError> {
        let timeout = overrides.timeout.unwrap_or(Duration::from_secs(30));
        match provider {
            "gemini" => {
                let cfg = &config.gemini;
                let api_key = Self::api_key(provider, &cfg.api_key, overrides.api_key)?;
                let model = overrides.model.unwrap_or(&cfg.model);
                Ok(Box::new(super::gemini::GeminiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    model,
                    timeout,
                )))
            }
            "openai" => {
                let cfg = &config.openai;
                let api_key = Self::api_key(provider, &cfg.api_key, overrides.api_key)?;
                let model = overrides.model.unwrap_or(&cfg.model);
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    model,
                    timeout,
                )))
            }
            other => Err(AnalysisError::Provider {
                message: format!(
                    "Unknown provider: {other} (expected one of: {})",
                    Self::PROVIDERS.join(", ")
                ),
                status_code: None,
            }),
        }
    }

    fn api_key(
        provider: &str,
        configured: &str,
        session: Option<&str>,
    ) -> Result<String, AnalysisError> {
        session
            .filter(|k| !k.is_empty())
            .map(String::from)
            .or_else(|| resolve_env_var(configured))
            .ok_or_else(|| AnalysisError::Provider {
                message: format!(
                    "{provider} API key not set. Set {} or provider.{provider}.api_key.",
                    api_key_env_var(provider).unwrap_or("the provider's key variable")
                ),
                status_code: None,
            })
    }
}
