//! Response parsing: recover a JSON object from raw model output.
//!
//! Even well-prompted models wrap their JSON in ``` fences, prepend
//! commentary ("Here is the result: ..."), or append sign-offs, despite the
//! prompt saying "raw JSON only". This module applies cheap deterministic
//! recovery steps before anyone gives up on a response:
//!
//! 1. Strip an outer ```json / ``` fence pair if present
//! 2. Parse the remainder as JSON
//! 3. If that fails (or parses to a non-object), salvage-parse the
//!    substring between the first `{` and the last `}`
//!
//! Failures here are [`ParseIssue`]s, not [`crate::error::CopilotError`]s:
//! the analysis client treats them as retry-eligible and only converts the
//! second failure into a caller-visible error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Why a raw response could not be turned into a JSON object.
#[derive(Debug, Error)]
pub enum ParseIssue {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("no JSON object found in response")]
    NoObject,
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip an outer markdown fence pair (```json ... ``` or ``` ... ```).
/// Text without an outer fence passes through unchanged.
pub fn strip_code_fences(raw: &str) -> &str {
    match RE_OUTER_FENCES.captures(raw.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw.trim(),
    }
}

/// Recover a JSON *object* from raw model output.
pub fn parse_object(raw: &str) -> Result<Value, ParseIssue> {
    let cleaned = strip_code_fences(raw);

    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) if value.is_object() => return Ok(value),
        Ok(_) => {}
        Err(e) => {
            if let Some(value) = salvage_parse(cleaned) {
                return Ok(value);
            }
            return Err(ParseIssue::InvalidJson(e.to_string()));
        }
    }

    // Parsed, but to a scalar or array; the object may still be embedded in
    // surrounding prose.
    salvage_parse(cleaned).ok_or(ParseIssue::NoObject)
}

/// Locate the outermost `{...}` span and try to parse just that.
fn salvage_parse(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&raw[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_parses() {
        let v = parse_object(r#"{"summary":"x"}"#).unwrap();
        assert_eq!(v["summary"], "x");
    }

    #[test]
    fn json_fence_stripped() {
        let raw = "```json\n{\"summary\":\"x\"}\n```";
        let v = parse_object(raw).unwrap();
        assert_eq!(v["summary"], "x");
    }

    #[test]
    fn bare_fence_stripped() {
        let raw = "```\n{\"summary\":\"x\"}\n```";
        assert_eq!(parse_object(raw).unwrap()["summary"], "x");
    }

    #[test]
    fn unfenced_text_passes_through_strip() {
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn salvage_from_surrounding_prose() {
        let raw = r#"Here is the result: {"summary":"x"} Thanks!"#;
        let v = parse_object(raw).unwrap();
        assert_eq!(v["summary"], "x");
    }

    #[test]
    fn salvage_handles_nested_braces() {
        let raw = r#"Sure! {"summary":"x","keyMetrics":[{"name":"CRP"}]} done"#;
        let v = parse_object(raw).unwrap();
        assert_eq!(v["keyMetrics"][0]["name"], "CRP");
    }

    #[test]
    fn garbage_is_invalid_json() {
        let err = parse_object("I could not read the document, sorry.").unwrap_err();
        assert!(matches!(err, ParseIssue::InvalidJson(_)));
    }

    #[test]
    fn scalar_json_is_no_object() {
        let err = parse_object("42").unwrap_err();
        assert!(matches!(err, ParseIssue::NoObject));
    }

    #[test]
    fn array_json_salvages_inner_object() {
        let v = parse_object(r#"[{"summary":"x"}]"#);
        // The outermost brace span is exactly the inner object.
        assert_eq!(v.unwrap()["summary"], "x");
    }

    #[test]
    fn fenced_prose_with_object_salvages() {
        let raw = "```json\nThe JSON you asked for: {\"summary\":\"x\"}\n```";
        assert_eq!(parse_object(raw).unwrap()["summary"], "x");
    }
}
