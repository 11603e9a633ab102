//! Composition root: task routing, provider lifecycle, generation flows

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::{GenerationEvent, GenerationEventStream};
use crate::intent::{self, Intent};
use crate::normalizer::{self, PromptExpander};
use crate::prompts::TemplateStore;
use crate::providers::{
    Capability, DesignModel, DesignStream, GeminiProvider, GroqProvider, ProviderTask,
    gemini, groq,
};
use crate::retry::{DEFAULT_TEMPERATURE, ProviderFactory, RetryController};
use crate::sink::ArtifactSink;
use crate::spec::{ArchitectureSpec, GenerateInput, GenerationResult};
use crate::stream;
use crate::validator;

/// The configured provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Groq,
}

impl ProviderKind {
    /// Capability set declared by the variant's provider implementation.
    fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Gemini => gemini::CAPABILITIES,
            Self::Groq => groq::CAPABILITIES,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Groq => write!(f, "groq"),
        }
    }
}

/// Credentials and model selection for one provider.
#[derive(Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"***")
            .field("model", &self.model)
            .finish()
    }
}

/// Per-provider settings handed in by the caller. A provider with no
/// entry here never qualifies for any task.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub gemini: Option<ModelSettings>,
    pub groq: Option<ModelSettings>,
}

impl ProviderSettings {
    fn get(&self, kind: ProviderKind) -> Option<&ModelSettings> {
        match kind {
            ProviderKind::Gemini => self.gemini.as_ref(),
            ProviderKind::Groq => self.groq.as_ref(),
        }
    }
}

/// Explicit per-task provider preference, primary first. Chat is
/// deliberately pinned to the secondary provider; design tasks prefer
/// the primary.
fn preference(task: ProviderTask) -> &'static [ProviderKind] {
    match task {
        ProviderTask::SystemDesign => &[ProviderKind::Gemini, ProviderKind::Groq],
        ProviderTask::ComponentTree => &[ProviderKind::Gemini, ProviderKind::Groq],
        ProviderTask::PromptExpansion => &[ProviderKind::Gemini, ProviderKind::Groq],
        ProviderTask::StructuredSpec => &[ProviderKind::Groq, ProviderKind::Gemini],
        ProviderTask::Chat => &[ProviderKind::Groq],
    }
}

/// Outcome of routing one chat message.
pub enum ChatOutcome {
    /// Plain conversational reply.
    Reply(String),
    /// The message asked for architecture; generation events follow.
    Generation(GenerationEventStream),
}

/// Composition root over the generation pipeline.
///
/// Routes each task to its preferred provider with fallback, caches
/// provider handles per orchestrator lifetime (construct once at first
/// use), and owns shutdown. The retry controller goes through
/// [`ProviderFactory`] instead, which always builds fresh instances so
/// each attempt runs at its own temperature.
pub struct Orchestrator {
    settings: ProviderSettings,
    templates: Arc<TemplateStore>,
    sinks: Vec<Arc<dyn ArtifactSink>>,
    gemini: OnceCell<Arc<dyn DesignModel>>,
    groq: OnceCell<Arc<dyn DesignModel>>,
    shut_down: AtomicBool,
}

impl Orchestrator {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            templates: Arc::new(TemplateStore::builtin()),
            sinks: Vec::new(),
            gemini: OnceCell::new(),
            groq: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_templates(mut self, templates: TemplateStore) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Resolve the first configured provider whose declared capability
    /// set covers `task`, in preference order.
    fn select(&self, task: ProviderTask) -> Result<ProviderKind> {
        let capability = task.required_capability();
        for &kind in preference(task) {
            if self.settings.get(kind).is_none() {
                debug!(provider = %kind, %task, "skipping provider without credentials");
                continue;
            }
            if !kind.capabilities().contains(&capability) {
                debug!(provider = %kind, %task, "skipping provider without capability");
                continue;
            }
            return Ok(kind);
        }
        Err(Error::CapabilityUnavailable {
            provider: "any configured provider".to_string(),
            capability,
        })
    }

    /// Build an uncached instance of `kind` at `temperature`.
    fn build(
        &self,
        kind: ProviderKind,
        task: ProviderTask,
        temperature: f32,
    ) -> Result<Arc<dyn DesignModel>> {
        let settings = self.settings.get(kind).ok_or_else(|| Error::Provider {
            provider: kind.to_string(),
            task,
            message: "credentials not configured".to_string(),
        })?;
        let provider: Arc<dyn DesignModel> = match kind {
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                settings.api_key.clone(),
                settings.model.clone(),
                temperature,
                self.templates.clone(),
            )),
            ProviderKind::Groq => Arc::new(GroqProvider::new(
                settings.api_key.clone(),
                settings.model.clone(),
                temperature,
                self.templates.clone(),
            )),
        };
        Ok(provider)
    }

    /// Cached handle for `kind`, constructed once at first use.
    async fn cached(&self, kind: ProviderKind, task: ProviderTask) -> Result<Arc<dyn DesignModel>> {
        let cell = match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Groq => &self.groq,
        };
        cell.get_or_try_init(|| async { self.build(kind, task, DEFAULT_TEMPERATURE) })
            .await
            .map(|provider| provider.clone())
    }

    /// Resolve the cached provider for `task` per the preference table.
    async fn provider(&self, task: ProviderTask) -> Result<Arc<dyn DesignModel>> {
        let kind = self.select(task)?;
        self.cached(kind, task).await
    }

    /// Normalize caller input into a canonical spec, expanding free-form
    /// prompts through the preferred expansion provider.
    pub async fn normalize(&self, input: &GenerateInput) -> Result<ArchitectureSpec> {
        normalizer::normalize(input, &LazyExpander { orchestrator: self }).await
    }

    /// Generate a validated architecture artifact, retrying with
    /// temperature escalation, then fan the result out to sinks.
    pub async fn generate_architecture(&self, input: &GenerateInput) -> Result<GenerationResult> {
        let spec = self.normalize(input).await?;
        info!(project = %spec.project_name, inferred = spec.inferred, "generating architecture");
        let result = RetryController::new(self).generate(&spec).await?;
        self.deliver(&result).await;
        Ok(result)
    }

    /// Stream the system design as one ordered chunk sequence.
    pub async fn stream_system_design(&self, input: &GenerateInput) -> Result<DesignStream> {
        let spec = self.normalize(input).await?;
        let provider = self.provider(ProviderTask::SystemDesign).await?;
        Ok(stream::multiplex(provider, spec.to_payload_text()))
    }

    /// One component-tree round trip for an already-generated design.
    pub async fn generate_component_tree(&self, system_design: &str) -> Result<Value> {
        let provider = self.provider(ProviderTask::ComponentTree).await?;
        provider.generate_component_tree(system_design).await
    }

    /// One-shot structured architecture JSON, without the retry loop.
    pub async fn generate_structured_spec(&self, input: &GenerateInput) -> Result<Value> {
        let spec = self.normalize(input).await?;
        let provider = self.provider(ProviderTask::StructuredSpec).await?;
        provider.generate_structured_spec(&spec.to_payload_text()).await
    }

    /// Answer a conversational message.
    pub async fn chat(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::EmptyField("message"));
        }
        let provider = self.provider(ProviderTask::Chat).await?;
        provider.chat(message).await
    }

    /// Route a chat message: answer directly, or hand off to generation
    /// when the message asks for architecture.
    pub async fn handle_chat_message(self: &Arc<Self>, message: &str) -> Result<ChatOutcome> {
        match intent::detect(message) {
            Intent::Chat => Ok(ChatOutcome::Reply(self.chat(message).await?)),
            Intent::GenerateArchitecture => {
                debug!("chat message handed off to generation");
                let input = GenerateInput::from_prompt(message);
                Ok(ChatOutcome::Generation(
                    self.clone().stream_generation(input, true),
                ))
            }
        }
    }

    /// Full generation flow as a typed event stream: optional handoff
    /// marker, normalized spec, streamed design chunks, the component
    /// tree when a capable provider is reachable, then done.
    pub fn stream_generation(
        self: Arc<Self>,
        input: GenerateInput,
        handoff: bool,
    ) -> GenerationEventStream {
        Box::pin(try_stream! {
            if handoff {
                yield GenerationEvent::Handoff;
            }

            let spec = self.normalize(&input).await?;
            yield GenerationEvent::InputSpec { spec: spec.clone() };

            let provider = self.provider(ProviderTask::SystemDesign).await?;
            let mut chunks = stream::multiplex(provider, spec.to_payload_text());
            let mut system_design = String::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                system_design.push_str(&chunk);
                yield GenerationEvent::SystemDesign { chunk };
            }

            let partial = GenerationResult::new(system_design, None);
            validator::validate(&partial)?;

            match self.generate_component_tree(&partial.system_design).await {
                Ok(tree) => yield GenerationEvent::ComponentTree { tree },
                // Design-only degradation mirrors the non-streaming path.
                Err(Error::CapabilityUnavailable { .. }) => {}
                Err(err) => Err(err)?,
            }

            yield GenerationEvent::Done;
        })
    }

    async fn deliver(&self, result: &GenerationResult) {
        for sink in &self.sinks {
            if let Err(err) = sink.deliver(result).await {
                warn!(sink = sink.name(), error = %err, "artifact sink failed; result unaffected");
            }
        }
    }

    /// Release held provider resources. Idempotent; tolerates providers
    /// that were never instantiated.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        for cell in [&self.gemini, &self.groq] {
            if let Some(provider) = cell.get() {
                provider.shutdown().await;
            }
        }
        info!("orchestrator shut down");
    }
}

/// Resolves the expansion provider only when the prompt shape is taken.
struct LazyExpander<'a> {
    orchestrator: &'a Orchestrator,
}

#[async_trait]
impl PromptExpander for LazyExpander<'_> {
    async fn expand_prompt_to_spec(&self, prompt: &str) -> Result<ArchitectureSpec> {
        let provider = self
            .orchestrator
            .provider(ProviderTask::PromptExpansion)
            .await?;
        provider.expand_prompt_to_spec(prompt).await
    }
}

#[async_trait]
impl ProviderFactory for Orchestrator {
    /// Fresh, uncached instance per call: retry escalation must not share
    /// sampling state across attempts.
    async fn provider_for(
        &self,
        task: ProviderTask,
        temperature: f32,
    ) -> Result<Arc<dyn DesignModel>> {
        let kind = self.select(task)?;
        self.build(kind, task, temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_settings() -> ProviderSettings {
        ProviderSettings {
            gemini: Some(ModelSettings {
                api_key: "gm-key".to_string(),
                model: "gemini-2.5-flash".to_string(),
            }),
            groq: Some(ModelSettings {
                api_key: "gq-key".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
            }),
        }
    }

    fn groq_only() -> ProviderSettings {
        ProviderSettings {
            gemini: None,
            ..both_settings()
        }
    }

    #[test]
    fn test_design_tasks_prefer_primary() {
        let orchestrator = Orchestrator::new(both_settings());
        assert_eq!(
            orchestrator.select(ProviderTask::SystemDesign).unwrap(),
            ProviderKind::Gemini
        );
        assert_eq!(
            orchestrator.select(ProviderTask::ComponentTree).unwrap(),
            ProviderKind::Gemini
        );
    }

    #[test]
    fn test_chat_pinned_to_secondary_even_with_primary_configured() {
        let orchestrator = Orchestrator::new(both_settings());
        assert_eq!(
            orchestrator.select(ProviderTask::Chat).unwrap(),
            ProviderKind::Groq
        );
    }

    #[test]
    fn test_structured_spec_prefers_secondary() {
        let orchestrator = Orchestrator::new(both_settings());
        assert_eq!(
            orchestrator.select(ProviderTask::StructuredSpec).unwrap(),
            ProviderKind::Groq
        );
    }

    #[test]
    fn test_missing_credentials_fall_back() {
        let orchestrator = Orchestrator::new(groq_only());
        assert_eq!(
            orchestrator.select(ProviderTask::SystemDesign).unwrap(),
            ProviderKind::Groq
        );
    }

    #[test]
    fn test_capability_gap_survives_fallback_order() {
        // Groq is configured but cannot build trees; with Gemini absent
        // the table is exhausted.
        let orchestrator = Orchestrator::new(groq_only());
        let err = orchestrator.select(ProviderTask::ComponentTree).unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable { .. }));
    }

    #[test]
    fn test_no_providers_configured_is_unavailable() {
        let orchestrator = Orchestrator::new(ProviderSettings::default());
        let err = orchestrator.select(ProviderTask::SystemDesign).unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_cached_handle_constructed_once() {
        let orchestrator = Orchestrator::new(both_settings());
        let first = orchestrator
            .cached(ProviderKind::Gemini, ProviderTask::SystemDesign)
            .await
            .unwrap();
        let second = orchestrator
            .cached(ProviderKind::Gemini, ProviderTask::SystemDesign)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_factory_builds_fresh_instances() {
        let orchestrator = Orchestrator::new(both_settings());
        let first = orchestrator
            .provider_for(ProviderTask::SystemDesign, 0.2)
            .await
            .unwrap();
        let second = orchestrator
            .provider_for(ProviderTask::SystemDesign, 0.2)
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_shutdown_idempotent_without_instantiated_providers() {
        let orchestrator = Orchestrator::new(both_settings());
        orchestrator.shutdown().await;
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let orchestrator = Orchestrator::new(both_settings());
        let err = orchestrator.chat("   ").await.unwrap_err();
        assert!(matches!(err, Error::EmptyField("message")));
    }

    #[tokio::test]
    async fn test_generate_rejects_missing_input_without_round_trips() {
        let orchestrator = Orchestrator::new(both_settings());
        let err = orchestrator
            .generate_architecture(&GenerateInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput));
    }

    #[tokio::test]
    async fn test_stream_generation_surfaces_routing_errors() {
        let orchestrator = Arc::new(Orchestrator::new(ProviderSettings::default()));
        let input = GenerateInput {
            project_name: Some("shop".to_string()),
            ..GenerateInput::default()
        };
        let mut events = orchestrator.stream_generation(input, false);
        // Structured input normalizes offline, so the spec event arrives
        // before routing fails.
        let first = events.next().await.unwrap().unwrap();
        assert!(matches!(first, GenerationEvent::InputSpec { .. }));
        let second = events.next().await.unwrap();
        assert!(matches!(
            second,
            Err(Error::CapabilityUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_invalidate_result() {
        use std::sync::atomic::AtomicU32;

        struct FailingSink;

        #[async_trait]
        impl ArtifactSink for FailingSink {
            fn name(&self) -> &str {
                "failing"
            }
            async fn deliver(&self, _result: &GenerationResult) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
        }

        struct CountingSink {
            delivered: AtomicU32,
        }

        #[async_trait]
        impl ArtifactSink for CountingSink {
            fn name(&self) -> &str {
                "counting"
            }
            async fn deliver(&self, _result: &GenerationResult) -> anyhow::Result<()> {
                self.delivered.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let counting = Arc::new(CountingSink {
            delivered: AtomicU32::new(0),
        });
        let orchestrator = Orchestrator::new(both_settings())
            .with_sink(Arc::new(FailingSink))
            .with_sink(counting.clone());

        let result = GenerationResult::new("a design".to_string(), None);
        // The failing sink is logged and skipped; later sinks still run.
        orchestrator.deliver(&result).await;
        assert_eq!(counting.delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_model_settings_debug_masks_key() {
        let settings = ModelSettings {
            api_key: "very-secret".to_string(),
            model: "m".to_string(),
        };
        assert!(!format!("{settings:?}").contains("very-secret"));
    }
}
