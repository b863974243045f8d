//! Google Gemini provider using the `generateContent` REST API.
//!
//! The image travels as an `inline_data` part ahead of the prompt text.

use super::provider::{transport_error, AnalysisRequest, ProviderResponse, VisionProvider};
use super::timing::{read_body, RequestTimer};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini provider.
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models/{}", self.endpoint, self.model);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ProviderResponse, AnalysisError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };
        let payload = serde_json::to_vec(&body).map_err(|e| AnalysisError::Provider {
            message: format!("Failed to encode Gemini request: {e}"),
            status_code: None,
        })?;

        let mut timer = RequestTimer::start(request.timing_mode, payload.len() as u64);
        let resp = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .body(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", e))?;

        let status = resp.status();
        let bytes = read_body(resp, &mut timer)
            .await
            .map_err(|e| transport_error("Gemini", e))?;
        let timings = timer.finish();

        if !status.is_success() {
            return Err(AnalysisError::Provider {
                message: format!("Gemini HTTP {status}: {}", String::from_utf8_lossy(&bytes)),
                status_code: Some(status.as_u16()),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_slice(&bytes).map_err(|e| AnalysisError::Provider {
                message: format!("Failed to parse Gemini response: {e}"),
                status_code: None,
            })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AnalysisError::EmptyResponse {
                provider: "gemini".to_string(),
                message: "no text in candidates".to_string(),
            });
        }

        Ok(ProviderResponse {
            text,
            model: parsed.model_version.unwrap_or_else(|| self.model.clone()),
            tokens_used: parsed.usage_metadata.and_then(|u| u.total_token_count),
            http_status: status.as_u16(),
            timings,
        })
    }
}
