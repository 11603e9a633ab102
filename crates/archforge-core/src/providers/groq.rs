//! Groq provider (secondary, OpenAI-compatible wire format)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::json::extract_json;
use crate::prompts::{self, TemplateStore};
use crate::spec::ArchitectureSpec;

use super::types::{Capability, DesignModel, ProviderTask};

const BASE_URL: &str = "https://api.groq.com/openai";

pub(crate) const CAPABILITIES: &[Capability] = &[
    Capability::SystemDesign,
    Capability::PromptExpansion,
    Capability::StructuredSpec,
    Capability::Chat,
];

/// Groq provider
pub struct GroqProvider {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    templates: Arc<TemplateStore>,
}

impl std::fmt::Debug for GroqProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqProvider")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GroqProvider {
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

    /// One blocking round trip: prompt in, completion text out.
    async fn complete(&self, task: ProviderTask, prompt: String) -> Result<String> {
        let url = format!("{}/v1/chat/completions", BASE_URL);
        let body = GroqRequest {
            model: self.model.clone(),
            messages: vec![GroqMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!(model = %self.model, %task, "groq request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.provider_error(task, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.provider_error(task, format!("status {status}: {error_text}")));
        }

        let api_response: GroqApiResponse = response
            .json()
            .await
            .map_err(|e| self.provider_error(task, format!("malformed response: {e}")))?;

        debug!(
            model = %self.model,
            %task,
            choices = api_response.choices.len(),
            "groq response"
        );

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.provider_error(task, "response had no choices"))
    }
}

#[async_trait]
impl DesignModel for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn generate_system_design(&self, payload: &str) -> Result<String> {
        let prompt = self.templates.render(prompts::SYSTEM_DESIGN, payload)?;
        let text = self.complete(ProviderTask::SystemDesign, prompt).await?;
        Ok(text.trim().to_string())
    }

    async fn expand_prompt_to_spec(&self, prompt: &str) -> Result<ArchitectureSpec> {
        let rendered = self.templates.render(prompts::PROMPT_EXPANSION, prompt)?;
        let text = self.complete(ProviderTask::PromptExpansion, rendered).await?;
        ArchitectureSpec::from_provider_value(extract_json(&text)?)
    }

    async fn generate_structured_spec(&self, payload: &str) -> Result<Value> {
        let prompt = self.templates.render(prompts::STRUCTURED_SPEC, payload)?;
        let text = self.complete(ProviderTask::StructuredSpec, prompt).await?;
        extract_json(&text)
    }

    async fn chat(&self, message: &str) -> Result<String> {
        let prompt = self.templates.render(prompts::CHAT, message)?;
        let text = self.complete(ProviderTask::Chat, prompt).await?;
        Ok(text.trim().to_string())
    }

    async fn shutdown(&self) {
        debug!("groq provider shut down");
    }
}

// ── Groq wire types ──

#[derive(Debug, Clone, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GroqApiResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct GroqChoice {
    message: GroqChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct GroqChoiceMessage {
    content: Option<String>,
}
