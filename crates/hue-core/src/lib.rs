//! Hue Core - vision-model image analysis library.
//!
//! Sends images to a vision model together with a named prompt and records
//! the answer, the HTTP status and request timings for each image.
//!
//! # Architecture
//!
//! ```text
//! Image → Validate/Encode → Provider request (timed, retried) → AnalysisResult
//!                                                            → BatchReport / JSON / CSV
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use hue_core::{Analyzer, AnalyzeOptions, Config, ProviderFactory, ProviderOverrides};
//!
//! #[tokio::main]
//! async fn main() -> hue_core::Result<()> {
//!     let config = Config::load()?;
//!     let provider = ProviderFactory::create("gemini", &config.provider, ProviderOverrides::default())?;
//!     let analyzer = Analyzer::new(provider, &config, AnalyzeOptions::from_config(&config));
//!
//!     let result = analyzer.analyze_image("./images/red.jpg".as_ref(), None).await;
//!     println!("{}", result.summary_line());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod llm;
pub mod output;
pub mod pipeline;
mod report;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{AnalysisError, ConfigError, HueError, Result};
pub use export::{export_results, ExportOptions, ExportReport, SecondarySort, SortMethod};
pub use llm::{ProviderFactory, ProviderOverrides, TimingMode, VisionProvider};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{AnalyzeOptions, Analyzer, BatchOptions, BatchRunner, DiscoveredFile, FileDiscovery};
pub use types::{AnalysisResult, BatchReport, BatchSummary, ProcessingStatistics};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
