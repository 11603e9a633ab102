//! Coercion of caller input into a canonical ArchitectureSpec

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::spec::{ArchitectureSpec, GenerateInput};

/// Source of the prompt-expansion capability for free-form input. The
/// orchestrator resolves a provider lazily behind this; tests stub it.
#[async_trait]
pub trait PromptExpander: Send + Sync {
    async fn expand_prompt_to_spec(&self, prompt: &str) -> Result<ArchitectureSpec>;
}

/// Normalize caller input into a canonical spec.
///
/// Structured fields and a free-form prompt are mutually exclusive, with
/// structured fields taking precedence. Only the prompt shape costs a
/// provider round trip.
pub async fn normalize(
    input: &GenerateInput,
    expander: &dyn PromptExpander,
) -> Result<ArchitectureSpec> {
    if input.project_name.is_some() {
        return normalize_structured(input);
    }

    if let Some(prompt) = &input.prompt {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::EmptyField("prompt"));
        }
        debug!("expanding free-form prompt into a spec");
        let mut spec = expander.expand_prompt_to_spec(prompt).await?;
        // Provider output never decides this: an expanded spec is always
        // marked inferred.
        spec.inferred = true;
        return Ok(spec);
    }

    Err(Error::MissingInput)
}

fn normalize_structured(input: &GenerateInput) -> Result<ArchitectureSpec> {
    let project_name = input.project_name.as_deref().unwrap_or_default().trim();
    if project_name.is_empty() {
        return Err(Error::EmptyField("project_name"));
    }

    Ok(ArchitectureSpec {
        project_name: project_name.to_string(),
        description: trimmed(&input.description),
        use_case: trimmed(&input.use_case),
        requirements: nonblank(&input.requirements),
        tech_stack: nonblank(&input.tech_stack),
        inferred: false,
    })
}

fn trimmed(field: &Option<String>) -> String {
    field.as_deref().unwrap_or_default().trim().to_string()
}

fn nonblank(entries: &Option<Vec<String>>) -> Vec<String> {
    entries
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Expander returning a fixed spec, deliberately with inferred=false
    /// to prove the normalizer forces it.
    struct FixedExpander;

    #[async_trait]
    impl PromptExpander for FixedExpander {
        async fn expand_prompt_to_spec(&self, prompt: &str) -> Result<ArchitectureSpec> {
            Ok(ArchitectureSpec {
                project_name: format!("expanded {prompt}"),
                description: "inferred description".to_string(),
                use_case: String::new(),
                requirements: vec!["req".to_string()],
                tech_stack: Vec::new(),
                inferred: false,
            })
        }
    }

    /// Expander that must never be consulted.
    struct PanickingExpander;

    #[async_trait]
    impl PromptExpander for PanickingExpander {
        async fn expand_prompt_to_spec(&self, _prompt: &str) -> Result<ArchitectureSpec> {
            panic!("structured input must not reach the expander");
        }
    }

    fn structured_input() -> GenerateInput {
        GenerateInput {
            project_name: Some("  shop  ".to_string()),
            description: Some(" an online shop ".to_string()),
            use_case: Some("selling".to_string()),
            requirements: Some(vec![
                "catalog".to_string(),
                "  ".to_string(),
                " checkout ".to_string(),
            ]),
            tech_stack: Some(vec!["rust".to_string(), String::new()]),
            prompt: None,
        }
    }

    #[tokio::test]
    async fn test_structured_input_trims_and_drops_blanks() {
        let spec = normalize(&structured_input(), &PanickingExpander)
            .await
            .unwrap();
        assert_eq!(spec.project_name, "shop");
        assert_eq!(spec.description, "an online shop");
        assert_eq!(spec.requirements, vec!["catalog", "checkout"]);
        assert_eq!(spec.tech_stack, vec!["rust"]);
        assert!(!spec.inferred);
    }

    #[tokio::test]
    async fn test_normalization_is_idempotent() {
        let once = normalize(&structured_input(), &PanickingExpander)
            .await
            .unwrap();
        let twice = normalize(&GenerateInput::from_spec(&once), &PanickingExpander)
            .await
            .unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_blank_project_name_rejected() {
        let input = GenerateInput {
            project_name: Some("   ".to_string()),
            ..GenerateInput::default()
        };
        let err = normalize(&input, &PanickingExpander).await.unwrap_err();
        assert!(matches!(err, Error::EmptyField("project_name")));
    }

    #[tokio::test]
    async fn test_prompt_shape_forces_inferred() {
        let input = GenerateInput::from_prompt("  a todo app  ");
        let spec = normalize(&input, &FixedExpander).await.unwrap();
        assert!(spec.inferred);
        // Prompt reaches the expander trimmed.
        assert_eq!(spec.project_name, "expanded a todo app");
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected() {
        let input = GenerateInput::from_prompt("   ");
        let err = normalize(&input, &PanickingExpander).await.unwrap_err();
        assert!(matches!(err, Error::EmptyField("prompt")));
    }

    #[tokio::test]
    async fn test_neither_shape_is_missing_input() {
        let err = normalize(&GenerateInput::default(), &PanickingExpander)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput));
    }

    #[tokio::test]
    async fn test_structured_fields_win_over_prompt() {
        let mut input = structured_input();
        input.prompt = Some("ignored".to_string());
        let spec = normalize(&input, &PanickingExpander).await.unwrap();
        assert_eq!(spec.project_name, "shop");
        assert!(!spec.inferred);
    }
}
