//! External REST API client used by the proxy routes.
//!
//! Thin `reqwest` wrapper: one request in, one response out. No retries and no
//! timeout of its own; the platform defaults apply. Response bodies are parsed
//! as JSON when possible and kept as a JSON string otherwise.

use axum::http::{Method, StatusCode};
use reqwest::Url;
use serde_json::Value;

/// Header carrying the tenant id, both inbound and towards the external API.
pub const CLIENTE_HEADER: &str = "cliente_id";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    Url(String),
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// One forwarded call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path segments appended to the base URL; each is percent-encoded.
    pub segments: Vec<String>,
    pub query: Option<String>,
    pub cliente_id: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    #[must_use]
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
            query: None,
            cliente_id: None,
            authorization: None,
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self { http: reqwest::Client::new(), base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the absolute URL for a request.
    ///
    /// Dot segments are refused: the URL parser would collapse them instead of
    /// encoding them, sending the call to a parent resource.
    pub fn url_for(&self, segments: &[String], query: Option<&str>) -> Result<Url, UpstreamError> {
        if let Some(bad) = segments.iter().find(|s| is_unsafe_segment(s)) {
            return Err(UpstreamError::Url(format!("path segment '{bad}' not allowed")));
        }
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| UpstreamError::Url(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    pub async fn send(&self, req: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.url_for(&req.segments, req.query.as_deref())?;
        tracing::debug!(method = %req.method, %url, "forwarding to external api");

        let mut builder = self
            .http
            .request(req.method, url)
            .header("Accept", "application/json");
        if let Some(cliente_id) = &req.cliente_id {
            builder = builder.header(CLIENTE_HEADER, cliente_id);
        }
        if let Some(auth) = &req.authorization {
            builder = builder.header("Authorization", auth);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok(UpstreamResponse { status, body: parse_body(&text) })
    }
}

/// `true` for path segments that cannot name a single resource.
#[must_use]
pub fn is_unsafe_segment(segment: &str) -> bool {
    matches!(segment, "" | "." | "..")
}

/// Parse an upstream body: JSON when possible, a JSON string otherwise.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned())))
}

#[cfg(test)]
#[path = "upstream_test.rs"]
mod tests;
