//! Shared helpers for unit tests: a scriptable provider and image fixtures.

use crate::error::AnalysisError;
use crate::llm::{AnalysisRequest, ProviderResponse, RequestTimings, VisionProvider};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ResponseFn = Box<dyn Fn(u32, &AnalysisRequest) -> Result<ProviderResponse, AnalysisError> + Send + Sync>;

/// Provider whose answers come from a closure of the call index.
pub(crate) struct MockProvider {
    response_fn: ResponseFn,
    pub call_count: Arc<AtomicU32>,
    pub prompts_seen: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicU32>,
    pub max_in_flight: Arc<AtomicU32>,
}

pub(crate) fn ok_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        text: text.to_string(),
        model: "mock-vision-1".to_string(),
        tokens_used: Some(42),
        http_status: 200,
        timings: RequestTimings {
            request_ms: 80.0,
            response_transfer_ms: 5.0,
            total_ms: 85.0,
            ..Default::default()
        },
    }
}

pub(crate) fn provider_error(status_code: Option<u16>, message: &str) -> AnalysisError {
    AnalysisError::Provider {
        message: message.to_string(),
        status_code,
    }
}

impl MockProvider {
    pub fn new(
        f: impl Fn(u32, &AnalysisRequest) -> Result<ProviderResponse, AnalysisError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            response_fn: Box::new(f),
            call_count: Arc::new(AtomicU32::new(0)),
            prompts_seen: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            in_flight: Arc::new(AtomicU32::new(0)),
            max_in_flight: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn success(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(ok_response(&text)))
    }

    pub fn failing(status_code: Option<u16>, message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_, _| Err(provider_error(status_code, &message)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl VisionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-vision-1"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ProviderResponse, AnalysisError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.prompts_seen.lock() {
            seen.push(request.prompt.clone());
        }
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.response_fn)(idx, request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Smallest byte sequence the validator accepts as a JPEG.
pub(crate) const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Write a fake JPEG named `name` into `dir`.
pub(crate) fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, JPEG_BYTES).unwrap();
    path
}
