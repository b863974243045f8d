//! Single-image analysis: prompt lookup, encoding, the provider call with
//! timeout and retries, and optional persistence of the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, PromptsConfig};
use crate::error::AnalysisError;
use crate::llm::{retry, AnalysisRequest, ImageInput, ProviderResponse, TimingMode, VisionProvider};
use crate::output;
use crate::types::{now_rfc3339, AnalysisResult};

use super::hash::content_hash;
use super::validate::Validator;

/// Request and retry settings for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timing_mode: TimingMode,
    /// Attach request timings to results
    pub record_timings: bool,
    /// Directory to save each result into, when individual saving is on
    pub save_dir: Option<PathBuf>,
    /// Pretty-print saved JSON
    pub pretty: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_tokens: 1024,
            temperature: 0.0,
            timing_mode: TimingMode::Standard,
            record_timings: true,
            save_dir: None,
            pretty: true,
        }
    }
}

impl AnalyzeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout_ms: config.api.timeout_ms,
            max_retries: config.api.max_retries,
            retry_delay_ms: config.api.retry_delay_ms,
            max_tokens: config.api.max_tokens,
            temperature: config.api.temperature,
            timing_mode: TimingMode::parse(&config.performance.timing_mode).unwrap_or_default(),
            record_timings: config.performance.enable_timing,
            save_dir: config
                .performance
                .save_individual_results
                .then(|| config.results_dir()),
            pretty: config.output.pretty,
        }
    }
}

/// Analyzes one image at a time against a vision provider.
pub struct Analyzer {
    provider: Arc<dyn VisionProvider>,
    prompts: PromptsConfig,
    validator: Validator,
    options: AnalyzeOptions,
}

impl Analyzer {
    pub fn new(provider: Box<dyn VisionProvider>, config: &Config, options: AnalyzeOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            prompts: config.prompts.clone(),
            validator: Validator::new(config.limits.clone()),
            options,
        }
    }

    pub fn provider(&self) -> &dyn VisionProvider {
        self.provider.as_ref()
    }

    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Name of the prompt used when none is requested.
    pub fn default_prompt(&self) -> &str {
        &self.prompts.default
    }

    /// Analyze one image, keyed by its file name.
    pub async fn analyze_image(&self, path: &Path, prompt: Option<&str>) -> AnalysisResult {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.analyze_named(path, &name, prompt).await
    }

    /// Analyze one image, keyed by `image_file`.
    ///
    /// Never fails: every problem is reported in the returned result.
    pub async fn analyze_named(
        &self,
        path: &Path,
        image_file: &str,
        prompt: Option<&str>,
    ) -> AnalysisResult {
        let start = Instant::now();
        let prompt_name = prompt.unwrap_or(&self.prompts.default);

        let mut result = match self.prompts.available.get(prompt_name) {
            Some(template) => {
                self.run(path, image_file, prompt_name, &template.text, start)
                    .await
            }
            None => AnalysisResult::failure(
                image_file,
                path.to_path_buf(),
                prompt_name,
                AnalysisError::UnknownPrompt(prompt_name.to_string()).to_string(),
            ),
        };
        result.processing_time_ms = elapsed_ms(start);

        if result.success {
            tracing::info!(
                "{} [{}] -> {:?} in {:.0} ms",
                image_file,
                prompt_name,
                result.response_text.as_deref().unwrap_or(""),
                result.processing_time_ms
            );
        } else {
            tracing::error!(
                "{} [{}] failed: {}",
                image_file,
                prompt_name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        if let Some(ref dir) = self.options.save_dir {
            let name = output::individual_filename(image_file, prompt, &crate::config::timestamp());
            if let Err(e) = output::save_json(&result, &dir.join(name), self.options.pretty) {
                tracing::warn!("Could not save result for {}: {e}", image_file);
            }
        }

        result
    }

    async fn run(
        &self,
        path: &Path,
        image_file: &str,
        prompt_name: &str,
        prompt_text: &str,
        start: Instant,
    ) -> AnalysisResult {
        let fail = |error: AnalysisError| {
            AnalysisResult::failure(image_file, path.to_path_buf(), prompt_name, error.to_string())
        };

        let read_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AnalysisError::FileNotFound(path.to_path_buf())
            } else {
                AnalysisError::ImageRead {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        };

        let len = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => return fail(read_error(e)),
        };
        if let Err(e) = self.validator.check_size(path, len) {
            return fail(e);
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => return fail(read_error(e)),
        };
        if let Err(e) = self.validator.validate_bytes(path, &bytes) {
            return fail(e);
        }

        let hash = content_hash(&bytes);
        let image = ImageInput::from_bytes(&bytes, path);
        let encode_ms = elapsed_ms(start);
        tracing::trace!("  Encode: {:.1} ms ({} bytes)", encode_ms, bytes.len());

        let request = AnalysisRequest {
            image,
            prompt: prompt_text.to_string(),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            timing_mode: self.options.timing_mode,
        };

        let (outcome, attempts) = self.call_with_retry(path, &request).await;

        let mut result = match outcome {
            Ok(response) => {
                let mut timings = response.timings;
                timings.encode_ms = encode_ms;
                AnalysisResult {
                    image_file: image_file.to_string(),
                    file_path: path.to_path_buf(),
                    prompt_used: prompt_name.to_string(),
                    success: true,
                    response_text: Some(response.text),
                    error: None,
                    http_status: Some(response.http_status),
                    model: Some(response.model),
                    tokens_used: response.tokens_used,
                    content_hash: None,
                    processing_time_ms: 0.0,
                    attempts,
                    timings: self.options.record_timings.then_some(timings),
                    analyzed_at: now_rfc3339(),
                }
            }
            Err(e) => {
                let status = e.status_code();
                let mut failed = fail(e);
                failed.http_status = status;
                failed.model = Some(self.provider.model().to_string());
                failed.attempts = attempts;
                failed
            }
        };
        result.content_hash = Some(hash);
        result
    }

    /// Call the provider, retrying transient failures with backoff.
    ///
    /// Returns the final outcome and the number of calls made.
    async fn call_with_retry(
        &self,
        path: &Path,
        request: &AnalysisRequest,
    ) -> (Result<ProviderResponse, AnalysisError>, u32) {
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = retry::backoff_duration(attempt - 1, self.options.retry_delay_ms);
                tracing::debug!(
                    "Retry {attempt}/{} for {:?} after {delay:?}",
                    self.options.max_retries,
                    path
                );
                tokio::time::sleep(delay).await;
            }
            attempts += 1;

            let error = match tokio::time::timeout(timeout, self.provider.analyze(request)).await {
                Ok(Ok(response)) => return (Ok(response), attempts),
                Ok(Err(e)) => e,
                Err(_) => AnalysisError::Timeout {
                    path: path.to_path_buf(),
                    timeout_ms: self.options.timeout_ms,
                },
            };

            let retryable = retry::is_retryable(&error);
            tracing::warn!(
                "{} attempt {attempts} failed for {:?}: {error}",
                self.provider.name(),
                path
            );
            last_error = Some(error);
            if !retryable {
                break;
            }
        }

        let error = last_error.unwrap_or_else(|| AnalysisError::Provider {
            message: "no attempts made".to_string(),
            status_code: None,
        });
        (Err(error), attempts)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
