//! Typed events for the generation flow
//!
//! The orchestrator emits these over [`GenerationEventStream`]; an HTTP
//! boundary serializes each one as a Server-Sent-Events frame.

use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::spec::ArchitectureSpec;

/// A lazy sequence of generation events.
pub type GenerationEventStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent>> + Send>>;

/// Events emitted over the course of one generation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// A chat message was upgraded to architecture generation.
    Handoff,
    /// The normalized spec the generation runs against.
    InputSpec { spec: ArchitectureSpec },
    /// One incremental chunk of the system design.
    SystemDesign { chunk: String },
    /// The optional component tree enrichment.
    ComponentTree { tree: Value },
    /// The flow is complete.
    Done,
}

impl GenerationEvent {
    /// Encode as one Server-Sent-Events frame: `data: {json}\n\n`.
    pub fn to_sse_frame(&self) -> String {
        let payload = serde_json::to_string(self).unwrap_or_default();
        format!("data: {payload}\n\n")
    }
}
