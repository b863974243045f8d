//! Image analysis pipeline.
//!
//! - **discovery**: Resolve file names and wildcard patterns to images
//! - **validate**: Size and magic-byte checks before upload
//! - **hash**: Content hashes recorded on results
//! - **analyzer**: One image x one prompt, with timeout and retries
//! - **batch**: Many images, bounded concurrency and request pacing

pub mod analyzer;
pub mod batch;
pub mod discovery;
pub mod hash;
pub mod validate;

pub use analyzer::{AnalyzeOptions, Analyzer};
pub use batch::{BatchOptions, BatchRunner};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::content_hash;
pub use validate::Validator;
