//! archforge-core - LLM generation orchestration
//!
//! This crate turns a loosely specified request into a validated
//! architecture artifact by coordinating interchangeable LLM providers:
//! - Capability-declared provider adapters (Gemini primary, Groq secondary)
//! - Bounded retries with temperature escalation and per-attempt instances
//! - Extraction and repair of JSON embedded in noisy model output
//! - One ordered token stream over streaming and non-streaming backends
//! - Partial-success validation (design mandatory, tree optional)

pub mod error;
pub mod events;
pub mod intent;
pub mod json;
pub mod normalizer;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod sink;
pub mod spec;
pub mod stream;
pub mod validator;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use events::{GenerationEvent, GenerationEventStream};
pub use intent::Intent;
pub use orchestrator::{ChatOutcome, ModelSettings, Orchestrator, ProviderKind, ProviderSettings};
pub use prompts::TemplateStore;
pub use providers::{Capability, DesignModel, DesignStream, GeminiProvider, GroqProvider, ProviderTask};
pub use retry::{
    DEFAULT_TEMPERATURE, MAX_RETRIES, ProviderFactory, RetryController, TEMPERATURE_SEQUENCE,
};
pub use sink::ArtifactSink;
pub use spec::{
    ArchitectureSpec, AttemptOutcome, GenerateInput, GenerationResult, RetryAttempt,
};
