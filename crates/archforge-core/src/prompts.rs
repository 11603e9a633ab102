//! Named prompt templates with a single substitution point

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Substitution marker; every template carries exactly one.
const PLACEHOLDER: &str = "{input}";

pub const SYSTEM_DESIGN: &str = "system_design";
pub const COMPONENT_TREE: &str = "component_tree";
pub const PROMPT_EXPANSION: &str = "prompt_expansion";
pub const STRUCTURED_SPEC: &str = "structured_spec";
pub const CHAT: &str = "chat";

const DEFAULT_SYSTEM_DESIGN: &str = "\
You are a senior software architect. Produce a complete system design for
the project described below: the major components, how they communicate,
the data they own, and the trade-offs behind each choice. Write plain
prose and lists, no code.

{input}";

const DEFAULT_COMPONENT_TREE: &str = "\
Given the system design below, produce the project scaffold as JSON with
exactly one top-level key \"folders\": an ordered array of folder path
strings, most fundamental first. Respond with JSON only, no commentary.

{input}";

const DEFAULT_PROMPT_EXPANSION: &str = "\
Expand the request below into a JSON object with the keys
\"project_name\", \"description\", \"use_case\", \"requirements\" (array
of strings) and \"tech_stack\" (array of strings). Infer sensible values
for anything the request leaves out. Respond with JSON only.

{input}";

const DEFAULT_STRUCTURED_SPEC: &str = "\
Produce a full architecture specification as a JSON object for the
project described below: components, responsibilities, interfaces and
data stores. Respond with JSON only, no commentary.

{input}";

const DEFAULT_CHAT: &str = "\
You are a concise assistant for a software architecture tool. Answer the
message below directly.

{input}";

/// Store of named prompt templates, preloaded with the built-ins.
///
/// Keys resolve at render time; an unknown key is a configuration error,
/// never a silent empty prompt.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateStore {
    /// Store holding only the built-in templates.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(SYSTEM_DESIGN.to_string(), DEFAULT_SYSTEM_DESIGN.to_string());
        templates.insert(
            COMPONENT_TREE.to_string(),
            DEFAULT_COMPONENT_TREE.to_string(),
        );
        templates.insert(
            PROMPT_EXPANSION.to_string(),
            DEFAULT_PROMPT_EXPANSION.to_string(),
        );
        templates.insert(
            STRUCTURED_SPEC.to_string(),
            DEFAULT_STRUCTURED_SPEC.to_string(),
        );
        templates.insert(CHAT.to_string(), DEFAULT_CHAT.to_string());
        Self { templates }
    }

    /// Register or replace a template. The template should carry one
    /// `{input}` substitution point.
    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Render `key`, substituting `input` at the template's substitution
    /// point.
    pub fn render(&self, key: &str, input: &str) -> Result<String> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| Error::TemplateNotFound(key.to_string()))?;
        Ok(template.replace(PLACEHOLDER, input))
    }
}
