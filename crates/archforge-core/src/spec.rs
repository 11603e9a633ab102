//! Canonical request and result types for architecture generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Canonical, normalized description of a generation request.
///
/// `project_name` is non-empty after normalization. When `inferred` is
/// true the spec was expanded from a free-form prompt and every other
/// field is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSpec {
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub use_case: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub inferred: bool,
}

impl ArchitectureSpec {
    /// Render the payload text block fed into design prompts.
    pub fn to_payload_text(&self) -> String {
        format!(
            "Project Name: {}\nDescription: {}\nUse Case: {}\nRequirements: {}\nTech Stack: {}",
            self.project_name,
            self.description,
            self.use_case,
            self.requirements.join(", "),
            self.tech_stack.join(", "),
        )
    }

    /// Deserialize a provider-returned JSON value, coercing common shape
    /// mismatches first.
    pub fn from_provider_value(mut value: Value) -> Result<Self> {
        coerce_spec_value(&mut value);
        let raw = value.to_string();
        serde_json::from_value(value).map_err(|source| Error::InvalidJson { raw, source })
    }
}

/// Fix common LLM type mismatches before deserialization: sequences that
/// arrived as delimited strings, and strings that arrived as sequences.
pub fn coerce_spec_value(value: &mut Value) {
    let Some(map) = value.as_object_mut() else {
        return;
    };

    if let Some(Value::String(s)) = map.get("requirements") {
        let items = split_nonempty(s, &['\n', ',']);
        map.insert("requirements".to_string(), Value::from(items));
    }
    if let Some(Value::String(s)) = map.get("tech_stack") {
        let items = split_nonempty(s, &['\n', ',']);
        map.insert("tech_stack".to_string(), Value::from(items));
    }
    if let Some(Value::Array(parts)) = map.get("use_case") {
        let joined = parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        map.insert("use_case".to_string(), Value::String(joined));
    }
}

fn split_nonempty(s: &str, separators: &[char]) -> Vec<String> {
    s.split(separators)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Raw caller input before normalization: either structured fields or a
/// free-form prompt, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateInput {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub use_case: Option<String>,
    #[serde(default)]
    pub requirements: Option<Vec<String>>,
    #[serde(default)]
    pub tech_stack: Option<Vec<String>>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl GenerateInput {
    /// Input carrying only a free-form prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// Input carrying an already-normalized spec's structured fields.
    pub fn from_spec(spec: &ArchitectureSpec) -> Self {
        Self {
            project_name: Some(spec.project_name.clone()),
            description: Some(spec.description.clone()),
            use_case: Some(spec.use_case.clone()),
            requirements: Some(spec.requirements.clone()),
            tech_stack: Some(spec.tech_stack.clone()),
            prompt: None,
        }
    }
}

/// How a single generation attempt ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { error: String },
}

/// Record of one generation attempt at a given temperature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    pub index: u32,
    pub temperature: f32,
    pub outcome: AttemptOutcome,
}

/// The validated artifact produced by a generation run.
///
/// `system_design` is always present on success; `component_tree` is an
/// optional enrichment and absent when no capable provider was reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub id: Uuid,
    pub system_design: String,
    pub component_tree: Option<Value>,
    pub attempts: Vec<RetryAttempt>,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(system_design: String, component_tree: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            system_design,
            component_tree,
            attempts: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
