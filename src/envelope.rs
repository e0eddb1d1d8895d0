//! JSON response envelope shared by every proxy route and the console client.
//!
//! Every route answers `{success, message?, data?, error?}` with a status code
//! that mirrors the upstream outcome. On the client side the same shape is
//! turned into a tagged [`ApiResult`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn ok(data: Option<T>, message: Option<String>) -> Self {
        Self { success: true, message, data, error: None }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), data: None, error: Some(error.into()) }
    }
}

// =============================================================================
// HTTP REPLY
// =============================================================================

/// An envelope paired with the status code it is served with.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Envelope,
}

impl Reply {
    #[must_use]
    pub fn new(status: StatusCode, body: Envelope) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn failure(status: StatusCode, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self { status, body: Envelope::failure(message, error) }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// =============================================================================
// UPSTREAM MESSAGE EXTRACTION
// =============================================================================

/// Best-effort human message from an upstream JSON error body.
///
/// Looks at `message`, `error`, `erro` and `detail`; `detail` may be a string
/// or a list of validation entries carrying `msg`.
#[must_use]
pub fn extract_message(body: &Value) -> Option<String> {
    if let Value::String(s) = body {
        return non_blank(s);
    }
    let obj = body.as_object()?;
    for key in ["message", "error", "erro"] {
        if let Some(msg) = obj.get(key).and_then(Value::as_str).and_then(non_blank) {
            return Some(msg);
        }
    }
    match obj.get("detail")? {
        Value::String(s) => non_blank(s),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() { None } else { Some(msgs.join("; ")) }
        }
        _ => None,
    }
}

/// Split an upstream success body into `(data, message)`.
///
/// Bodies that are already envelopes (`success` is a boolean) are unwrapped so
/// callers never see a nested envelope.
#[must_use]
pub fn unwrap_success(body: Option<Value>) -> (Option<Value>, Option<String>) {
    match body {
        Some(Value::Object(mut map)) if map.get("success").is_some_and(Value::is_boolean) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .and_then(non_blank);
            let data = map.remove("data").filter(|v| !v.is_null());
            (data, message)
        }
        other => (other, None),
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

// =============================================================================
// CLIENT-SIDE RESULT
// =============================================================================

/// Failure half of [`ApiResult`]: the status code and the best message found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct ApiFailure {
    pub status: u16,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiFailure>;

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
