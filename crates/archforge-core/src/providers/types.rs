//! Provider-agnostic types for the generation pipeline

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::spec::ArchitectureSpec;

/// A lazy, forward-only, finite sequence of design text chunks.
pub type DesignStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A unit of work the orchestrator routes to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTask {
    SystemDesign,
    ComponentTree,
    PromptExpansion,
    StructuredSpec,
    Chat,
}

impl ProviderTask {
    /// The capability a provider must declare to serve this task.
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::SystemDesign => Capability::SystemDesign,
            Self::ComponentTree => Capability::ComponentTree,
            Self::PromptExpansion => Capability::PromptExpansion,
            Self::StructuredSpec => Capability::StructuredSpec,
            Self::Chat => Capability::Chat,
        }
    }
}

impl std::fmt::Display for ProviderTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SystemDesign => write!(f, "system_design"),
            Self::ComponentTree => write!(f, "component_tree"),
            Self::PromptExpansion => write!(f, "prompt_expansion"),
            Self::StructuredSpec => write!(f, "structured_spec"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// A task a provider is able to perform, declared at registration.
/// Routing checks these declared sets; nothing probes a provider at call
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SystemDesign,
    ComponentTree,
    StreamSystemDesign,
    PromptExpansion,
    StructuredSpec,
    Chat,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SystemDesign => write!(f, "system design generation"),
            Self::ComponentTree => write!(f, "component tree generation"),
            Self::StreamSystemDesign => write!(f, "streamed system design generation"),
            Self::PromptExpansion => write!(f, "prompt expansion"),
            Self::StructuredSpec => write!(f, "structured spec generation"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// Uniform interface over heterogeneous LLM backends.
///
/// Implementations declare their capability set up front and override the
/// matching methods. The default bodies answer
/// [`Error::CapabilityUnavailable`], so a missing capability is an
/// explicit routing signal rather than a silent failure.
#[async_trait]
pub trait DesignModel: Send + Sync {
    /// Provider name carried in errors and logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Capability set declared at registration.
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    async fn generate_system_design(&self, _payload: &str) -> Result<String> {
        Err(self.unavailable(Capability::SystemDesign))
    }

    async fn generate_component_tree(&self, _system_design: &str) -> Result<Value> {
        Err(self.unavailable(Capability::ComponentTree))
    }

    /// Native incremental chunks. Only meaningful when the provider
    /// declares [`Capability::StreamSystemDesign`]; consumers go through
    /// the multiplexer rather than calling this directly.
    fn stream_system_design(&self, _payload: &str) -> DesignStream {
        let err = self.unavailable(Capability::StreamSystemDesign);
        Box::pin(futures_util::stream::once(async move {
            Err::<String, _>(err)
        }))
    }

    async fn expand_prompt_to_spec(&self, _prompt: &str) -> Result<ArchitectureSpec> {
        Err(self.unavailable(Capability::PromptExpansion))
    }

    async fn generate_structured_spec(&self, _payload: &str) -> Result<Value> {
        Err(self.unavailable(Capability::StructuredSpec))
    }

    async fn chat(&self, _message: &str) -> Result<String> {
        Err(self.unavailable(Capability::Chat))
    }

    /// Release held resources. Idempotent; the default holds nothing.
    async fn shutdown(&self) {}

    #[doc(hidden)]
    fn unavailable(&self, capability: Capability) -> Error {
        Error::CapabilityUnavailable {
            provider: self.name().to_string(),
            capability,
        }
    }
}
