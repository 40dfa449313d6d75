//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! All OpenAI wire types are private to this module. The provider is
//! stateless: one request, one user turn, no history.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::config::PrimaryConfig;
use crate::llm::{CompletionProvider, ProviderError};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup. `reqwest::Client` is an `Arc` internally so
/// clones share the connection pool.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from `[primary]` config and the `OPENAI_API_KEY`.
    pub fn new(config: &PrimaryConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        let temperature = accepts_temperature(&self.model).then_some(self.temperature);

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: [Message { role: "user", content }],
            max_tokens: self.max_tokens,
            temperature,
        };

        debug!(
            model = %self.model,
            max_tokens = self.max_tokens,
            temperature = ?temperature,
            content_len = content.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "completion request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            ProviderError::Malformed(format!("failed to parse response body: {e}"))
        })?;

        trace!(choices = parsed.choices.len(), "received completion response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Malformed("empty or missing content in response".into()))
    }
}

/// Reasoning models (o-series, gpt-5 family) reject a temperature parameter.
fn accepts_temperature(model: &str) -> bool {
    !["gpt-5", "o1", "o3", "o4"].iter().any(|p| model.starts_with(p))
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Pass a successful response through, or turn it into [`ProviderError::Status`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("{}{code}", env.error.message)
        }
        Err(_) => body,
    };

    Err(ProviderError::Status { status: status.as_u16(), message })
}
