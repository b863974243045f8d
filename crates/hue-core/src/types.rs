//! Core data types produced by an analysis run.
//!
//! An `AnalysisResult` is the outcome of one image x prompt request. A batch
//! collects them into a `BatchReport` keyed by image name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::llm::{RequestTimings, TimingMode};

/// Outcome of analyzing one image with one prompt.
///
/// Failures are results too: `success` is false and `error` says why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    // === Identification ===
    /// Image name as shown to the user (relative to the image directory)
    pub image_file: String,

    /// Full path to the image
    pub file_path: PathBuf,

    /// Name of the prompt sent with the image
    pub prompt_used: String,

    // === Outcome ===
    pub success: bool,

    /// Model answer, trimmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,

    /// Error message for failed analyses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// HTTP status of the last provider response, when one was received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    // === Provider details ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,

    /// BLAKE3 hash of the image bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,

    // === Timing ===
    /// Wall-clock time for the whole analysis, retries included
    pub processing_time_ms: f64,

    /// Provider calls made (1 when the first attempt settled it)
    #[serde(default)]
    pub attempts: u32,

    /// Timing of the last provider exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<RequestTimings>,

    /// RFC 3339 timestamp of when the analysis finished
    pub analyzed_at: String,
}

impl AnalysisResult {
    /// A failed result that never reached the provider.
    pub fn failure(image_file: &str, file_path: PathBuf, prompt: &str, error: String) -> Self {
        Self {
            image_file: image_file.to_string(),
            file_path,
            prompt_used: prompt.to_string(),
            success: false,
            response_text: None,
            error: Some(error),
            http_status: None,
            model: None,
            tokens_used: None,
            content_hash: None,
            processing_time_ms: 0.0,
            attempts: 0,
            timings: None,
            analyzed_at: now_rfc3339(),
        }
    }

    /// One-line summary for terminal output.
    pub fn summary_line(&self) -> String {
        if self.success {
            format!(
                "{} [{}] -> {} ({:.0} ms)",
                self.image_file,
                self.prompt_used,
                self.response_text.as_deref().unwrap_or(""),
                self.processing_time_ms
            )
        } else {
            format!(
                "{} [{}] FAILED: {}",
                self.image_file,
                self.prompt_used,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

/// Batch-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub start_time: String,
    pub end_time: String,
    pub total_images: usize,
    pub prompt_used: String,
    /// Config file the run was configured from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    pub timing_mode: TimingMode,
    pub successful: usize,
    pub failed: usize,
}

/// Aggregate counts and times for a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_images: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of successful analyses (0 for an empty batch)
    pub success_rate: f64,
    /// Mean processing time over every result, failures included
    pub average_processing_time_ms: f64,
    pub total_processing_time_ms: f64,
}

/// Results of running one prompt over a set of images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub metadata: BatchMetadata,
    /// Results keyed by image name
    pub results: BTreeMap<String, AnalysisResult>,
    pub summary: BatchSummary,
}

/// Min/max/avg of one timing phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStat {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Timing statistics over the successful results of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStatistics {
    pub summary: BatchSummary,
    /// Phase name -> statistics
    pub timing_statistics: BTreeMap<String, TimingStat>,
    pub total_images_processed: usize,
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339()
}
