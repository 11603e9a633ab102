//! Structural validation of generation results

use crate::error::{Error, Result};
use crate::spec::GenerationResult;

/// Check that a result carries the mandatory artifact and, when present,
/// a well-shaped component tree.
///
/// A missing tree is not an error: a fallback provider without
/// tree-generation capability still yields a useful design.
pub fn validate(result: &GenerationResult) -> Result<()> {
    if result.system_design.trim().is_empty() {
        return Err(Error::InvalidResult(
            "system_design is empty".to_string(),
        ));
    }

    if let Some(tree) = &result.component_tree {
        if !tree.is_object() {
            return Err(Error::InvalidResult(
                "component_tree must be an object".to_string(),
            ));
        }
        let folders = tree.get("folders").ok_or_else(|| {
            Error::InvalidResult("component_tree is missing the folders key".to_string())
        })?;
        if !folders.is_array() {
            return Err(Error::InvalidResult(
                "component_tree.folders must be a sequence".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(design: &str, tree: Option<serde_json::Value>) -> GenerationResult {
        GenerationResult::new(design.to_string(), tree)
    }

    #[test]
    fn test_design_with_tree_passes() {
        let ok = result("a design", Some(json!({"folders": ["src", "tests"]})));
        assert!(validate(&ok).is_ok());
    }

    #[test]
    fn test_missing_tree_is_partial_success() {
        assert!(validate(&result("a design", None)).is_ok());
    }

    #[test]
    fn test_empty_folders_sequence_passes() {
        assert!(validate(&result("a design", Some(json!({"folders": []})))).is_ok());
    }

    #[test]
    fn test_empty_design_rejected_regardless_of_tree() {
        assert!(validate(&result("", None)).is_err());
        assert!(validate(&result("   \n", Some(json!({"folders": ["src"]})))).is_err());
    }

    #[test]
    fn test_tree_without_folders_rejected() {
        let err = validate(&result("a design", Some(json!({"files": []})))).unwrap_err();
        assert!(matches!(err, Error::InvalidResult(_)));
    }

    #[test]
    fn test_non_object_tree_rejected() {
        assert!(validate(&result("a design", Some(json!(["src"])))).is_err());
        assert!(validate(&result("a design", Some(json!({"folders": "src"})))).is_err());
    }
}
