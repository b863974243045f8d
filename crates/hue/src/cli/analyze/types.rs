//! CLI enum types for analysis: output format, timing mode, provider.

use clap::ValueEnum;
use hue_core::{OutputFormat as CoreOutputFormat, TimingMode};

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document (the batch report)
    #[default]
    Json,
    /// One result per line, written as each image completes
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// How request timings are captured.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum TimingModeArg {
    /// Read the response body in one call
    Standard,
    /// Stream the body and record first byte, chunks and throughput
    Precise,
}

impl From<TimingModeArg> for TimingMode {
    fn from(mode: TimingModeArg) -> Self {
        match mode {
            TimingModeArg::Standard => TimingMode::Standard,
            TimingModeArg::Precise => TimingMode::Precise,
        }
    }
}

/// Supported vision providers.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ProviderArg {
    /// Google Gemini API
    Gemini,
    /// OpenAI or any Chat Completions compatible endpoint
    Openai,
}

impl std::fmt::Display for ProviderArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderArg::Gemini => write!(f, "gemini"),
            ProviderArg::Openai => write!(f, "openai"),
        }
    }
}
