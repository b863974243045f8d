//! Vision model integration.
//!
//! A provider abstraction over Gemini and OpenAI-compatible backends, with
//! request timing and retry classification shared between them.

pub(crate) mod gemini;
pub(crate) mod openai;
pub(crate) mod provider;
pub(crate) mod retry;
pub(crate) mod timing;

pub use provider::{
    api_key_env_var, resolve_env_var, AnalysisRequest, ImageInput, ProviderFactory,
    ProviderOverrides, ProviderResponse, VisionProvider,
};
pub use retry::{backoff_duration, is_retryable};
pub use timing::{RequestTimer, RequestTimings, TimingMode, TransferStats};
