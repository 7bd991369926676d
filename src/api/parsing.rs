use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::errors::PortalError;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

/// HTTP method of an API Gateway v2 or v1 proxy event, uppercased.
#[must_use]
pub fn request_method(event: &Value) -> String {
    v_str(event, &["requestContext", "http", "method"])
        .or_else(|| v_str(event, &["httpMethod"]))
        .unwrap_or("POST")
        .to_ascii_uppercase()
}

#[must_use]
pub fn request_path(event: &Value) -> &str {
    v_str(event, &["rawPath"])
        .or_else(|| v_str(event, &["path"]))
        .unwrap_or("/")
}

/// Request body as text, decoding it when the gateway base64-encoded it.
///
/// # Errors
///
/// Returns a validation error when the body is not a string or is not valid
/// base64 / UTF-8.
pub fn request_body(event: &Value) -> Result<String, PortalError> {
    let body = match event.get("body") {
        None | Some(Value::Null) => return Ok(String::new()),
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(PortalError::ValidationError("Invalid body format".to_string()));
        }
    };

    let encoded = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !encoded {
        return Ok(body.clone());
    }

    let bytes = STANDARD
        .decode(body.trim())
        .map_err(|e| PortalError::ValidationError(format!("Invalid base64 body: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| PortalError::ValidationError(format!("Body is not UTF-8: {e}")))
}

/// Parses the JSON body; an empty body counts as `{}`.
///
/// # Errors
///
/// Returns a validation error for malformed JSON.
pub fn json_body(event: &Value) -> Result<Value, PortalError> {
    let body = request_body(event)?;
    if body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    Ok(serde_json::from_str(&body)?)
}
