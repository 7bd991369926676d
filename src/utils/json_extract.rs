use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::PortalError;

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```[a-z]*\s*").expect("static regex compile"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```\s*$").expect("static regex compile"));

/// Removes a surrounding markdown code fence, if any.
#[must_use]
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_head = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE.replace(&without_head, "").trim().to_string()
}

/// Returns the slice between the first `{` and the last `}`.
#[must_use]
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Best-effort extraction of a JSON object from an LLM reply.
///
/// # Errors
///
/// Returns `PortalError::LlmParse` carrying the raw reply when no object can be
/// found or the object does not parse.
pub fn extract_json_object(raw: &str) -> Result<Value, PortalError> {
    let cleaned = strip_code_fences(raw);
    let Some(span) = object_span(&cleaned) else {
        return Err(PortalError::LlmParse {
            message: "No valid JSON object found in response".to_string(),
            raw: raw.to_string(),
        });
    };

    serde_json::from_str(span).map_err(|e| PortalError::LlmParse {
        message: e.to_string(),
        raw: raw.to_string(),
    })
}

/// Extracts and deserializes a JSON object from an LLM reply.
///
/// # Errors
///
/// Returns `PortalError::LlmParse` when extraction fails or the object does
/// not have the expected shape.
pub fn parse_llm_json<T: DeserializeOwned>(raw: &str) -> Result<T, PortalError> {
    let value = extract_json_object(raw)?;
    serde_json::from_value(value).map_err(|e| PortalError::LlmParse {
        message: e.to_string(),
        raw: raw.to_string(),
    })
}
