//! Shared forwarding plumbing for the resource routes.
//!
//! Each resource handler extracts a [`Scoped`] (tenant required) or
//! [`Unscoped`] target, optionally validates a JSON body, describes the call
//! with a [`Forward`] and hands both to [`forward`]. Every failure path is an
//! envelope; nothing here panics or retries.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode};
use serde_json::Value;

use crate::config::ConfigError;
use crate::envelope::{Envelope, Reply, extract_message, unwrap_success};
use crate::state::AppState;
use crate::upstream::{CLIENTE_HEADER, UpstreamClient, UpstreamRequest, UpstreamResponse, is_unsafe_segment};

// =============================================================================
// TARGET EXTRACTORS
// =============================================================================

/// Where a forwarded call goes and which caller headers travel with it.
pub struct Target {
    pub upstream: Arc<UpstreamClient>,
    pub cliente_id: Option<String>,
    pub authorization: Option<String>,
}

/// Target for tenant-scoped routes. Rejects with 500 when the external API is
/// not configured, then 400 when the `cliente_id` header is absent or blank.
pub struct Scoped(pub Target);

/// Target for routes that forward the tenant header only if present.
pub struct Unscoped(pub Target);

impl<S> FromRequestParts<S> for Scoped
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Reply;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let upstream = configured_upstream(&AppState::from_ref(state))?;
        let Some(cliente_id) = header_text(&parts.headers, CLIENTE_HEADER) else {
            tracing::debug!(path = %parts.uri.path(), "rejecting request without cliente_id");
            return Err(Reply::failure(
                StatusCode::BAD_REQUEST,
                "cliente_id é obrigatório",
                "header cliente_id ausente",
            ));
        };
        Ok(Self(Target {
            upstream,
            cliente_id: Some(cliente_id),
            authorization: header_text(&parts.headers, AUTHORIZATION.as_str()),
        }))
    }
}

impl<S> FromRequestParts<S> for Unscoped
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Reply;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let upstream = configured_upstream(&AppState::from_ref(state))?;
        Ok(Self(Target {
            upstream,
            cliente_id: header_text(&parts.headers, CLIENTE_HEADER),
            authorization: header_text(&parts.headers, AUTHORIZATION.as_str()),
        }))
    }
}

fn configured_upstream(state: &AppState) -> Result<Arc<UpstreamClient>, Reply> {
    state.upstream.clone().map_err(|e| {
        tracing::error!(error = %e, "external api not configured");
        not_configured(&e)
    })
}

pub(crate) fn not_configured(err: &ConfigError) -> Reply {
    Reply::failure(StatusCode::INTERNAL_SERVER_ERROR, "API externa não configurada", err.to_string())
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

// =============================================================================
// BODY VALIDATION
// =============================================================================

/// Parse an optional JSON body; an empty body is `None`.
pub fn optional_json(body: &Bytes) -> Result<Option<Value>, Reply> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| invalid_body(e.to_string()))
}

/// Parse a JSON body that must be present.
pub fn required_json(body: &Bytes) -> Result<Value, Reply> {
    optional_json(body)?.ok_or_else(|| invalid_body("corpo vazio".to_owned()))
}

pub(crate) fn invalid_body(detail: String) -> Reply {
    Reply::failure(StatusCode::BAD_REQUEST, "Corpo da requisição inválido", detail)
}

// =============================================================================
// FORWARDING
// =============================================================================

/// Description of one forwarded call.
pub struct Forward {
    /// Portuguese verb phrase used in failure messages, e.g. "listar leads".
    action: &'static str,
    method: Method,
    segments: Vec<String>,
    query: Option<String>,
    body: Option<Value>,
    success_status: Option<StatusCode>,
}

impl Forward {
    #[must_use]
    pub fn new(action: &'static str, method: Method, segments: &[&str]) -> Self {
        Self {
            action,
            method,
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
            query: None,
            body: None,
            success_status: None,
        }
    }

    #[must_use]
    pub fn query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Answer 201 on any upstream success.
    #[must_use]
    pub fn created(mut self) -> Self {
        self.success_status = Some(StatusCode::CREATED);
        self
    }
}

/// Send the call and map the outcome to an envelope.
pub async fn forward(target: Target, fwd: Forward) -> Reply {
    let Forward { action, method, segments, query, body, success_status } = fwd;
    if let Some(bad) = segments.iter().find(|s| is_unsafe_segment(s)) {
        tracing::debug!(segment = %bad, action, "rejecting dot path segment");
        return Reply::failure(
            StatusCode::BAD_REQUEST,
            "Parâmetro de rota inválido",
            format!("segmento '{bad}' não permitido"),
        );
    }
    let req = UpstreamRequest {
        method,
        segments,
        query,
        cliente_id: target.cliente_id,
        authorization: target.authorization,
        body,
    };

    match target.upstream.send(req).await {
        Ok(resp) => {
            if !resp.status.is_success() {
                tracing::warn!(status = resp.status.as_u16(), action, "external api returned an error");
            }
            map_response(action, resp, success_status)
        }
        Err(e) => {
            tracing::error!(error = %e, action, "external api request failed");
            Reply::failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Erro ao {action}"), e.to_string())
        }
    }
}

pub(crate) fn map_response(action: &str, resp: UpstreamResponse, success_status: Option<StatusCode>) -> Reply {
    if resp.status.is_success() {
        let (data, message) = unwrap_success(resp.body);
        // The reply always carries an envelope, which a 204 cannot.
        let status = match success_status.unwrap_or(resp.status) {
            StatusCode::NO_CONTENT => StatusCode::OK,
            other => other,
        };
        return Reply::new(status, Envelope::ok(data, message));
    }

    let message = resp
        .body
        .as_ref()
        .and_then(extract_message)
        .unwrap_or_else(|| format!("Erro ao {action}"));
    let error = resp
        .status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", resp.status.as_u16()), str::to_owned);
    Reply::failure(resp.status, message, error)
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
