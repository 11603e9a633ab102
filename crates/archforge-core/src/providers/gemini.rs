//! Google Gemini provider (primary)

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::json::extract_json;
use crate::prompts::{self, TemplateStore};
use crate::spec::ArchitectureSpec;

use super::types::{Capability, DesignModel, DesignStream, ProviderTask};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub(crate) const CAPABILITIES: &[Capability] = &[
    Capability::SystemDesign,
    Capability::ComponentTree,
    Capability::StreamSystemDesign,
    Capability::PromptExpansion,
];

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    templates: Arc<TemplateStore>,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: String,
        temperature: f32,
        templates: Arc<TemplateStore>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
            temperature,
            templates,
        }
    }

    fn provider_error(&self, task: ProviderTask, message: impl Into<String>) -> Error {
        Error::Provider {
            provider: self.name().to_string(),
            task,
            message: message.into(),
        }
    }

    /// One blocking round trip: prompt in, candidate text out.
    async fn generate(&self, task: ProviderTask, prompt: String) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            BASE_URL, self.model, self.api_key
        );
        let body = GeminiRequest::user(prompt, self.temperature);

        debug!(model = %self.model, %task, "gemini request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.provider_error(task, format!("request failed: {e}")))?;
        let response = ensure_success(response, self.name(), task).await?;

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .map_err(|e| self.provider_error(task, format!("malformed response: {e}")))?;

        debug!(
            model = %self.model,
            %task,
            candidates = api_response.candidates.len(),
            "gemini response"
        );

        api_response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| self.provider_error(task, "response had no candidates"))
    }
}

#[async_trait]
impl DesignModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn generate_system_design(&self, payload: &str) -> Result<String> {
        let prompt = self.templates.render(prompts::SYSTEM_DESIGN, payload)?;
        let text = self.generate(ProviderTask::SystemDesign, prompt).await?;
        Ok(text.trim().to_string())
    }

    async fn generate_component_tree(&self, system_design: &str) -> Result<Value> {
        let prompt = self.templates.render(prompts::COMPONENT_TREE, system_design)?;
        let text = self.generate(ProviderTask::ComponentTree, prompt).await?;
        extract_json(&text)
    }

    fn stream_system_design(&self, payload: &str) -> DesignStream {
        let rendered = self.templates.render(prompts::SYSTEM_DESIGN, payload);
        let client = self.client.clone();
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            BASE_URL, self.model, self.api_key
        );
        let temperature = self.temperature;
        let provider = self.name().to_string();
        let task = ProviderTask::SystemDesign;

        Box::pin(try_stream! {
            let provider_error = |message: String| Error::Provider {
                provider: provider.clone(),
                task,
                message,
            };

            let prompt = rendered?;
            let body = GeminiRequest::user(prompt, temperature);
            let response = client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| provider_error(format!("request failed: {e}")))?;
            let response = ensure_success(response, &provider, task).await?;

            let mut bytes = response.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| provider_error(format!("stream failed: {e}")))?;
                let text = String::from_utf8_lossy(&chunk);
                for data in text.split("data: ").skip(1) {
                    let trimmed = data.trim();
                    if trimmed.is_empty() || trimmed.starts_with("[DONE]") {
                        continue;
                    }
                    match serde_json::from_str::<GeminiApiResponse>(trimmed) {
                        Ok(resp) => {
                            if let Some(piece) = resp.first_text() {
                                yield piece.to_string();
                            }
                        }
                        Err(err) => warn!("failed to parse gemini stream chunk: {err}"),
                    }
                }
            }
        })
    }

    async fn expand_prompt_to_spec(&self, prompt: &str) -> Result<ArchitectureSpec> {
        let rendered = self.templates.render(prompts::PROMPT_EXPANSION, prompt)?;
        let text = self.generate(ProviderTask::PromptExpansion, rendered).await?;
        ArchitectureSpec::from_provider_value(extract_json(&text)?)
    }

    async fn shutdown(&self) {
        debug!("gemini provider shut down");
    }
}

/// Pass a successful response through; read the body of a failed one
/// into the error message.
async fn ensure_success(
    response: reqwest::Response,
    provider: &str,
    task: ProviderTask,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(Error::Provider {
        provider: provider.to_string(),
        task,
        message: format!("status {status}: {error_text}"),
    })
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

impl GeminiRequest {
    fn user(prompt: String, temperature: f32) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: Some(prompt) }],
            }],
            generation_config: GeminiGenerationConfig { temperature },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiApiResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            "gm-secret".to_string(),
            "gemini-2.5-flash".to_string(),
            0.2,
            Arc::new(TemplateStore::builtin()),
        )
    }

    #[test]
    fn test_capability_set_excludes_chat_and_structured_spec() {
        let provider = provider();
        assert!(provider.supports(Capability::SystemDesign));
        assert!(provider.supports(Capability::StreamSystemDesign));
        assert!(provider.supports(Capability::ComponentTree));
        assert!(provider.supports(Capability::PromptExpansion));
        assert!(!provider.supports(Capability::Chat));
        assert!(!provider.supports(Capability::StructuredSpec));
    }

    #[tokio::test]
    async fn test_chat_is_unavailable() {
        let err = provider().chat("hello").await.unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable { .. }));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("gm-secret"));
    }

    #[test]
    fn test_request_serializes_generation_config() {
        let body = GeminiRequest::user("hello".to_string(), 0.5);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_first_text_skips_textless_parts() {
        let resp: GeminiApiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{}, {"text": "the design"}]
                }
            }]
        }))
        .unwrap();
        assert_eq!(resp.first_text(), Some("the design"));
    }
}
