//! Error taxonomy for the generation pipeline

use thiserror::Error;

use crate::providers::{Capability, ProviderTask};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure class the pipeline can surface.
///
/// The retry controller absorbs the transient classes (provider, format,
/// validation); callers only ever see caller-input errors or
/// [`Error::ExhaustedRetries`], which carries enough context to tell
/// invalid input apart from exhausted resilience.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied field was blank after trimming.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// Neither structured fields nor a free-form prompt were supplied.
    #[error("either structured fields or a prompt must be provided")]
    MissingInput,

    /// A prompt template key did not resolve.
    #[error("prompt template not found: {0}")]
    TemplateNotFound(String),

    /// A provider round trip failed.
    #[error("provider {provider} failed on {task}: {message}")]
    Provider {
        provider: String,
        task: ProviderTask,
        message: String,
    },

    /// Model output contained no bracketed region to parse.
    #[error("no JSON object or array found in model output")]
    NoJsonFound,

    /// A bracketed region was found but did not parse. The raw candidate
    /// text is preserved for diagnostics.
    #[error("model returned malformed JSON: {source}")]
    InvalidJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// Output parsed but is structurally incomplete.
    #[error("invalid generation result: {0}")]
    InvalidResult(String),

    /// The resolved provider does not declare the required capability.
    #[error("{capability} is unavailable on {provider}")]
    CapabilityUnavailable {
        provider: String,
        capability: Capability,
    },

    /// All attempts were consumed without a valid result.
    #[error("generation failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether the retry controller should run another attempt after this
    /// failure. Caller-input errors bypass retry; a capability gap triggers
    /// fallback at routing time, not another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. }
                | Self::NoJsonFound
                | Self::InvalidJson { .. }
                | Self::InvalidResult(_)
        )
    }
}
