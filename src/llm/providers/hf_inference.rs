//! Hugging Face text-generation inference, used as the fallback tier.
//!
//! [`HfInferenceLoader`] is cheap to construct and does no I/O until
//! [`GeneratorLoader::load`] is called. Loading builds the HTTP client and,
//! unless disabled, asks the model hub whether the model exists and is a
//! text-generation model. The resulting [`HfGenerator`] is then reused for
//! every fallback request.
//!
//! Wire format (`POST {api_base_url}/{model}`):
//!
//! ```text
//! → {"inputs": "...", "parameters": {"max_new_tokens": 150, "do_sample": true, "return_full_text": true}}
//! ← [{"generated_text": "..."}]
//! ```

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FallbackConfig;
use crate::llm::{GeneratorLoader, ProviderError, TextGenerator};

const TEXT_GENERATION_TAG: &str = "text-generation";

// ── Loader ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HfInferenceLoader {
    config: FallbackConfig,
    token: Option<String>,
}

impl HfInferenceLoader {
    /// `token` is `HF_TOKEN`; `None` uses the anonymous (rate-limited) tier.
    pub fn new(config: FallbackConfig, token: Option<String>) -> Self {
        Self { config, token }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn verify_model(&self, client: &Client) -> Result<(), ProviderError> {
        let url = format!("{}/api/models/{}", self.config.hub_url.trim_end_matches('/'), self.config.model);
        let response = with_token(client.get(&url), self.token.as_deref())
            .send()
            .await
            .map_err(|e| ProviderError::Load(format!("model lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Load(format!(
                "model '{}' is not available (HTTP {status})",
                self.config.model
            )));
        }

        let info = response
            .json::<ModelInfo>()
            .await
            .map_err(|e| ProviderError::Load(format!("unreadable model info: {e}")))?;

        match info.pipeline_tag.as_deref() {
            None | Some(TEXT_GENERATION_TAG) => Ok(()),
            Some(other) => Err(ProviderError::Load(format!(
                "model '{}' is a {other} model, not {TEXT_GENERATION_TAG}",
                self.config.model
            ))),
        }
    }
}

impl GeneratorLoader for HfInferenceLoader {
    type Generator = HfGenerator;

    async fn load(&self) -> Result<HfGenerator, ProviderError> {
        info!(model = %self.config.model, "loading fallback generator");

        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Load(format!("failed to build HTTP client: {e}")))?;

        if self.config.verify_model {
            self.verify_model(&client).await?;
        }

        let endpoint = format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model
        );

        Ok(HfGenerator {
            client,
            endpoint,
            token: self.token.clone(),
            parameters: GenerationParameters {
                max_new_tokens: self.config.max_new_tokens,
                do_sample: self.config.do_sample,
                return_full_text: true,
            },
        })
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// A loaded fallback model endpoint.
#[derive(Debug)]
pub struct HfGenerator {
    client: Client,
    endpoint: String,
    token: Option<String>,
    parameters: GenerationParameters,
}

impl TextGenerator for HfGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let payload = GenerationRequest { inputs: prompt, parameters: &self.parameters };

        debug!(
            endpoint = %self.endpoint,
            max_new_tokens = self.parameters.max_new_tokens,
            do_sample = self.parameters.do_sample,
            "sending generation request"
        );

        let response = with_token(self.client.post(&self.endpoint), self.token.as_deref())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The inference API reports errors as `{"error": "..."}`.
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ProviderError::Status { status: status.as_u16(), message });
        }

        let parsed = response
            .json::<GenerationResponse>()
            .await
            .map_err(|e| ProviderError::Malformed(format!("failed to parse response body: {e}")))?;

        let first = match parsed {
            GenerationResponse::Many(items) => items.into_iter().next(),
            GenerationResponse::One(item) => Some(item),
        };
        first
            .map(|item| item.generated_text)
            .ok_or_else(|| ProviderError::Malformed("empty generation result".into()))
    }
}

fn with_token(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => req.bearer_auth(token),
        None => req,
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParameters,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    pipeline_tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config(server_url: &str, verify_model: bool) -> FallbackConfig {
        FallbackConfig {
            api_base_url: format!("{server_url}/models"),
            hub_url: server_url.to_string(),
            model: "gpt2".into(),
            max_new_tokens: 150,
            do_sample: true,
            verify_model,
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn load_verifies_model_then_generates() {
        let mut server = mockito::Server::new_async().await;
        let hub = server
            .mock("GET", "/api/models/gpt2")
            .match_header("authorization", "Bearer hf_test")
            .with_status(200)
            .with_body(r#"{"id":"gpt2","pipeline_tag":"text-generation"}"#)
            .create_async()
            .await;
        let generation = server
            .mock("POST", "/models/gpt2")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::Json(json!({
                "inputs": "Hello",
                "parameters": { "max_new_tokens": 150, "do_sample": true, "return_full_text": true }
            })))
            .with_status(200)
            .with_body(r#"[{"generated_text":"Hello... world"}]"#)
            .create_async()
            .await;

        let loader = HfInferenceLoader::new(config(&server.url(), true), Some("hf_test".into()));
        let generator = loader.load().await.unwrap();
        let text = generator.generate("Hello").await.unwrap();

        assert_eq!(text.as_deref(), Some("Hello... world"));
        hub.assert_async().await;
        generation.assert_async().await;
    }

    #[tokio::test]
    async fn load_rejects_non_generation_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/models/gpt2")
            .with_status(200)
            .with_body(r#"{"pipeline_tag":"fill-mask"}"#)
            .create_async()
            .await;

        let loader = HfInferenceLoader::new(config(&server.url(), true), None);
        match loader.load().await {
            Err(ProviderError::Load(msg)) => assert!(msg.contains("fill-mask")),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_fails_for_unknown_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/models/gpt2")
            .with_status(404)
            .create_async()
            .await;

        let loader = HfInferenceLoader::new(config(&server.url(), true), None);
        assert!(matches!(loader.load().await, Err(ProviderError::Load(_))));
    }

    #[tokio::test]
    async fn skip_verification_does_no_io() {
        // Unroutable hub; loading must still succeed.
        let loader = HfInferenceLoader::new(config("http://127.0.0.1:1", false), None);
        assert!(loader.load().await.is_ok());
    }

    #[tokio::test]
    async fn missing_generated_text_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gpt2")
            .with_status(200)
            .with_body(r#"[{"score": 0.1}]"#)
            .create_async()
            .await;

        let generator = HfInferenceLoader::new(config(&server.url(), false), None)
            .load()
            .await
            .unwrap();
        assert_eq!(generator.generate("Hello").await.unwrap(), None);
    }

    #[tokio::test]
    async fn single_object_response_is_accepted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gpt2")
            .with_status(200)
            .with_body(r#"{"generated_text":"Hi"}"#)
            .create_async()
            .await;

        let generator = HfInferenceLoader::new(config(&server.url(), false), None)
            .load()
            .await
            .unwrap();
        assert_eq!(generator.generate("Hello").await.unwrap().as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn empty_result_list_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gpt2")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let generator = HfInferenceLoader::new(config(&server.url(), false), None)
            .load()
            .await
            .unwrap();
        assert!(matches!(generator.generate("Hello").await, Err(ProviderError::Malformed(_))));
    }

    #[tokio::test]
    async fn loading_model_error_is_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gpt2")
            .with_status(503)
            .with_body(r#"{"error":"Model gpt2 is currently loading","estimated_time":20.0}"#)
            .create_async()
            .await;

        let generator = HfInferenceLoader::new(config(&server.url(), false), None)
            .load()
            .await
            .unwrap();
        match generator.generate("Hello").await {
            Err(ProviderError::Status { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "Model gpt2 is currently loading");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
