//! Interchangeable LLM backends behind one capability interface

pub mod gemini;
pub mod groq;
mod types;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use types::{Capability, DesignModel, DesignStream, ProviderTask};
