//! Response builders shared by every route.
//!
//! All responses are JSON and carry the CORS headers the portal's browser
//! clients need.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::errors::PortalError;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

fn cors_headers() -> Value {
    json!({
        "Access-Control-Allow-Origin": ALLOW_ORIGIN,
        "Access-Control-Allow-Headers": ALLOW_HEADERS,
        "Content-Type": "application/json",
    })
}

/// Returns a response with `body` serialised as JSON.
#[must_use]
pub fn json_response<T: Serialize>(status_code: u16, body: &T) -> Value {
    let body = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialise response body: {}", e);
        "{}".to_string()
    });
    json!({
        "statusCode": status_code,
        "headers": cors_headers(),
        "body": body,
    })
}

/// Returns a 200 OK response with the given JSON body.
#[must_use]
pub fn ok_json<T: Serialize>(body: &T) -> Value {
    json_response(200, body)
}

/// CORS preflight answer.
#[must_use]
pub fn preflight() -> Value {
    let mut headers = cors_headers();
    if let Value::Object(map) = &mut headers {
        map.insert("Content-Type".to_string(), json!("text/plain"));
    }
    json!({ "statusCode": 200, "headers": headers, "body": "ok" })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json_response(status_code, &json!({ "success": false, "error": message }))
}

/// Error response for a failed handler, with the status taken from the error.
#[must_use]
pub fn error_response(err: &PortalError) -> Value {
    err_response(err.status_code(), &err.to_string())
}

/// Answer for a generation whose LLM reply went to manual review.
#[must_use]
pub fn pending_response(message: &str) -> Value {
    json_response(
        500,
        &json!({ "success": false, "status": "pending", "error": message }),
    )
}
