//! OpenAI-compatible provider using the Chat Completions API.
//!
//! The image is sent as a data URL in the user message content array, so
//! any server speaking the same wire format works with a custom endpoint.

use super::provider::{transport_error, AnalysisRequest, ProviderResponse, VisionProvider};
use super::timing::{read_body, RequestTimer};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// `{base}/models/{model}` for the API serving the chat endpoint.
    fn models_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        let base = endpoint
            .strip_suffix("/chat/completions")
            .unwrap_or(endpoint);
        format!("{base}/models/{}", self.model)
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait]
impl VisionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let url = self.models_url();
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout.min(Duration::from_secs(10)))
            .send()
            .await
        {
            Ok(resp) => {
                tracing::debug!("OpenAI model lookup {url} -> {}", resp.status());
                resp.status().is_success()
            }
            Err(e) => {
                tracing::debug!("OpenAI model lookup {url} failed: {e}");
                false
            }
        }
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ProviderResponse, AnalysisError> {
        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                    ChatContent::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        };
        let payload = serde_json::to_vec(&body).map_err(|e| AnalysisError::Provider {
            message: format!("Failed to encode OpenAI request: {e}"),
            status_code: None,
        })?;

        let mut timer = RequestTimer::start(request.timing_mode, payload.len() as u64);
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .body(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", e))?;

        let status = resp.status();
        let bytes = read_body(resp, &mut timer)
            .await
            .map_err(|e| transport_error("OpenAI", e))?;
        let timings = timer.finish();

        if !status.is_success() {
            return Err(AnalysisError::Provider {
                message: format!("OpenAI HTTP {status}: {}", String::from_utf8_lossy(&bytes)),
                status_code: Some(status.as_u16()),
            });
        }

        let chat: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| AnalysisError::Provider {
                message: format!("Failed to parse OpenAI response: {e}"),
                status_code: None,
            })?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AnalysisError::EmptyResponse {
                provider: "openai".to_string(),
                message: "no content in choices".to_string(),
            })?;

        Ok(ProviderResponse {
            text,
            model: chat.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: chat.usage.map(|u| u.total_tokens),
            http_status: status.as_u16(),
            timings,
        })
    }
}
