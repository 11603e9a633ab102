//! Extraction and repair of JSON embedded in model output
//!
//! Models wrap JSON in code fences, preamble prose, and trailing
//! commentary. Extraction strips the known fence markers, then takes the
//! first balanced `{...}`/`[...]` region as the candidate. A parse
//! failure keeps the raw candidate for diagnostics; nothing here ever
//! degrades to an empty default object.

use serde_json::Value;

use crate::error::{Error, Result};

/// Fence markers in longest-match-first order.
const FENCES: &[&str] = &["```json", "```mermaid", "```"];

/// Recover the first JSON object or array embedded in noisy model output.
pub fn extract_json(text: &str) -> Result<Value> {
    let cleaned = strip_fences(text);
    let candidate = balanced_region(&cleaned).ok_or(Error::NoJsonFound)?;
    serde_json::from_str(candidate).map_err(|source| Error::InvalidJson {
        raw: candidate.to_string(),
        source,
    })
}

/// Remove known code-fence markers, case-insensitively, keeping the text
/// between them.
fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    'scan: while i < bytes.len() {
        for fence in FENCES {
            if bytes[i..].len() >= fence.len()
                && bytes[i..i + fence.len()].eq_ignore_ascii_case(fence.as_bytes())
            {
                i += fence.len();
                continue 'scan;
            }
        }
        match text[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }
    out
}

/// Locate the first balanced bracketed region, respecting string literals
/// and escapes. An unterminated region yields the tail so the parse error
/// carries the evidence.
fn balanced_region(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Some(&text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_fenced_json() {
        let text = "Here is the result:\n```json\n{\"a\":1}\n```\nThanks";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_extracts_bare_json_with_prose() {
        let text = "Sure! {\"folders\": [\"src\", \"tests\"]} hope that helps.";
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"folders": ["src", "tests"]})
        );
    }

    #[test]
    fn test_extracts_top_level_array() {
        assert_eq!(extract_json("[1, 2, 3] trailing").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_braces_inside_strings_do_not_close_region() {
        let text = "{\"note\": \"uses {braces} and \\\"quotes\\\"\", \"n\": 2}";
        let value = extract_json(text).unwrap();
        assert_eq!(value["n"], json!(2));
    }

    #[test]
    fn test_uppercase_fence_is_stripped() {
        let text = "```JSON\n{\"a\":1}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_nested_mermaid_fence_inside_value_is_stripped() {
        let text = "```json\n{\"diagram\": \"```mermaid graph TD```\"}\n```";
        // Fence stripping happens before region scanning, so the nested
        // fence cannot unbalance the candidate.
        let value = extract_json(text).unwrap();
        assert_eq!(value["diagram"], json!(" graph TD"));
    }

    #[test]
    fn test_no_brackets_is_no_json_found() {
        let err = extract_json("just prose, nothing structured").unwrap_err();
        assert!(matches!(err, Error::NoJsonFound));
    }

    #[test]
    fn test_unbalanced_region_preserves_raw() {
        let err = extract_json("{\"a\": 1").unwrap_err();
        match err {
            Error::InvalidJson { raw, .. } => assert_eq!(raw, "{\"a\": 1"),
            other => panic!("expected InvalidJson, got {other:?}"),
        }
    }
}
