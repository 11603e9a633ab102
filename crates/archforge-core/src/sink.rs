//! Fire-and-forget artifact delivery

use async_trait::async_trait;

use crate::spec::GenerationResult;

/// Receives a finished generation result (persistence, zip building,
/// embedding indexes). Sink failures are logged by the orchestrator and
/// never invalidate the generation that produced the result.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Sink name carried in logs.
    fn name(&self) -> &str;

    async fn deliver(&self, result: &GenerationResult) -> anyhow::Result<()>;
}
