//! Bounded retries with temperature escalation

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::providers::{DesignModel, ProviderTask};
use crate::spec::{ArchitectureSpec, AttemptOutcome, GenerationResult, RetryAttempt};
use crate::validator;

/// Maximum number of generation attempts per request.
pub const MAX_RETRIES: u32 = 3;

/// Sampling temperatures, one per attempt. Each retry is strictly more
/// deterministic: formatting failures shrink as randomness shrinks.
pub const TEMPERATURE_SEQUENCE: [f32; MAX_RETRIES as usize] = [0.2, 0.1, 0.0];

/// Temperature used for provider calls outside the retry loop.
pub const DEFAULT_TEMPERATURE: f32 = TEMPERATURE_SEQUENCE[0];

/// Builds a provider instance able to serve `task` at `temperature`.
///
/// The orchestrator's implementation applies the preference table and
/// capability fallback; tests substitute scripted stubs.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn provider_for(
        &self,
        task: ProviderTask,
        temperature: f32,
    ) -> Result<Arc<dyn DesignModel>>;
}

/// Drives up to [`MAX_RETRIES`] generation attempts, one temperature per
/// attempt, building a fresh provider instance each time so no sampling
/// state is shared across attempts.
pub struct RetryController<'a> {
    factory: &'a dyn ProviderFactory,
}

impl<'a> RetryController<'a> {
    pub fn new(factory: &'a dyn ProviderFactory) -> Self {
        Self { factory }
    }

    /// Generate a validated result for `spec`, escalating determinism on
    /// each failed attempt. Caller-input errors bypass the loop; on
    /// exhaustion the last transient error is wrapped in
    /// [`Error::ExhaustedRetries`].
    pub async fn generate(&self, spec: &ArchitectureSpec) -> Result<GenerationResult> {
        let payload = spec.to_payload_text();
        let mut attempts: Vec<RetryAttempt> = Vec::with_capacity(TEMPERATURE_SEQUENCE.len());
        let mut last_error: Option<Error> = None;

        for (index, &temperature) in TEMPERATURE_SEQUENCE.iter().enumerate() {
            let index = index as u32;
            debug!(attempt = index, temperature, "starting generation attempt");

            match self.attempt(&payload, temperature).await {
                Ok(mut result) => {
                    attempts.push(RetryAttempt {
                        index,
                        temperature,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    result.attempts = attempts;
                    return Ok(result);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(attempt = index, temperature, error = %err, "generation attempt failed");
                    attempts.push(RetryAttempt {
                        index,
                        temperature,
                        outcome: AttemptOutcome::Failed {
                            error: err.to_string(),
                        },
                    });
                    last_error = Some(err);
                }
            }
        }

        let source = last_error
            .unwrap_or_else(|| Error::InvalidResult("no attempts were made".to_string()));
        Err(Error::ExhaustedRetries {
            attempts: MAX_RETRIES,
            source: Box::new(source),
        })
    }

    /// One full attempt: fresh provider at `temperature`, design then
    /// tree then validation.
    async fn attempt(&self, payload: &str, temperature: f32) -> Result<GenerationResult> {
        let design_provider = self
            .factory
            .provider_for(ProviderTask::SystemDesign, temperature)
            .await?;
        let system_design = design_provider.generate_system_design(payload).await?;

        let component_tree = match self
            .factory
            .provider_for(ProviderTask::ComponentTree, temperature)
            .await
        {
            Ok(provider) => Some(provider.generate_component_tree(&system_design).await?),
            // No capable provider is reachable; the validator accepts a
            // design-only result.
            Err(Error::CapabilityUnavailable { .. }) => None,
            Err(err) => return Err(err),
        };

        let result = GenerationResult::new(system_design, component_tree);
        validator::validate(&result)?;
        Ok(result)
    }
}
