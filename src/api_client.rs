//! Console-side client for the `/api/...` proxy routes.
//!
//! Every call carries the current tenant in the `cliente_id` header and comes
//! back as an [`ApiResult`]: the unwrapped `data` on success, or the status
//! and best message found on failure.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here panics. Transport failures become `ApiFailure { status: 0 }`;
//! an envelope reporting `success: false` is a failure even under a 2xx.

use axum::http::Method;
use reqwest::Url;
use serde_json::Value;

use crate::config::{self, ConfigError, RuntimeConfig};
use crate::envelope::{ApiFailure, ApiResult, extract_message, unwrap_success};
use crate::upstream::{CLIENTE_HEADER, is_unsafe_segment};

#[derive(Debug, Clone)]
pub struct CrmApi {
    http: reqwest::Client,
    base: Url,
    cliente_id: Option<String>,
    access_token: Option<String>,
}

impl CrmApi {
    /// Client for `base`, which may be relative (`/api`) when an `origin` to
    /// resolve it against is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] when `base` cannot be turned into
    /// an absolute http(s) URL.
    pub fn new(base: &str, origin: Option<&str>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidApiUrl { url: base.to_owned(), reason };
        let base_url = if base.starts_with('/') {
            let origin = origin.ok_or_else(|| invalid("relative base needs an origin".into()))?;
            Url::parse(origin)
                .and_then(|o| o.join(base))
                .map_err(|e| invalid(e.to_string()))?
        } else {
            Url::parse(base).map_err(|e| invalid(e.to_string()))?
        };
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https".into()));
        }
        Ok(Self { http: reqwest::Client::new(), base: base_url, cliente_id: None, access_token: None })
    }

    /// Client configured from the environment the same way the console is:
    /// runtime override file, then `API_URL`, with the relative `/api` base in
    /// development.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] that prevented resolving a base URL.
    pub fn from_env(origin: Option<&str>) -> Result<Self, ConfigError> {
        let runtime = match std::env::var("RUNTIME_CONFIG_PATH") {
            Ok(path) => RuntimeConfig::load(std::path::Path::new(&path))?,
            Err(_) => RuntimeConfig::default(),
        };
        let build_time = std::env::var("API_URL").ok();
        let base = config::resolve_client_api_base(
            runtime.api_url.as_deref(),
            build_time.as_deref(),
            config::is_development(),
        )?;
        Self::new(&base, origin)
    }

    #[must_use]
    pub fn with_cliente_id(mut self, cliente_id: Option<String>) -> Self {
        self.cliente_id = cliente_id;
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn set_cliente_id(&mut self, cliente_id: Option<String>) {
        self.cliente_id = cliente_id;
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn cliente_id(&self) -> Option<&str> {
        self.cliente_id.as_deref()
    }

    // -- generic verbs ---------------------------------------------------------

    pub async fn get(&self, path: &[&str], query: &[(&str, &str)]) -> ApiResult<Value> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &[&str], body: &Value) -> ApiResult<Value> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put(&self, path: &[&str], body: &Value) -> ApiResult<Value> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn patch(&self, path: &[&str], body: &Value) -> ApiResult<Value> {
        self.request(Method::PATCH, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &[&str]) -> ApiResult<Value> {
        self.request(Method::DELETE, path, &[], None).await
    }

    // -- leads -----------------------------------------------------------------

    pub async fn list_leads(&self) -> ApiResult<Value> {
        self.get(&["leads"], &[]).await
    }

    pub async fn search_leads(&self, query: &[(&str, &str)]) -> ApiResult<Value> {
        self.get(&["leads", "search"], query).await
    }

    pub async fn get_lead(&self, id: &str) -> ApiResult<Value> {
        self.get(&["leads", id], &[]).await
    }

    pub async fn create_lead(&self, lead: &Value) -> ApiResult<Value> {
        self.post(&["leads"], lead).await
    }

    pub async fn bulk_create_leads(&self, leads: &[Value]) -> ApiResult<Value> {
        self.post(&["leads", "bulk"], &Value::Array(leads.to_vec())).await
    }

    pub async fn update_lead(&self, id: &str, changes: &Value) -> ApiResult<Value> {
        self.patch(&["leads", id], changes).await
    }

    pub async fn delete_lead(&self, id: &str) -> ApiResult<Value> {
        self.delete(&["leads", id]).await
    }

    // -- plumbing --------------------------------------------------------------

    fn url_for(&self, path: &[&str], query: &[(&str, &str)]) -> ApiResult<Url> {
        if let Some(bad) = path.iter().find(|s| is_unsafe_segment(s)) {
            return Err(ApiFailure { status: 400, message: format!("segmento '{bad}' não permitido") });
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiFailure { status: 0, message: format!("base url cannot take a path: {}", self.base) })?
            .pop_if_empty()
            .extend(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = self.url_for(path, query)?;
        let mut builder = self.http.request(method.clone(), url).header("Accept", "application/json");
        if let Some(cliente_id) = &self.cliente_id {
            builder = builder.header(CLIENTE_HEADER, cliente_id);
        }
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let transport = |e: reqwest::Error| ApiFailure { status: 0, message: e.to_string() };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport)?;
        let result = interpret(status, &text);
        if let Err(failure) = &result {
            tracing::debug!(%method, path = %path.join("/"), status, message = %failure.message, "api call failed");
        }
        result
    }
}

/// Turn a proxy response into an [`ApiResult`].
fn interpret(status: u16, text: &str) -> ApiResult<Value> {
    let body = if text.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned())))
    };

    if !(200..300).contains(&status) {
        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(ApiFailure { status, message });
    }

    if let Some(Value::Object(map)) = &body
        && map.get("success") == Some(&Value::Bool(false))
    {
        let message = extract_message(&Value::Object(map.clone())).unwrap_or_else(|| "request failed".into());
        return Err(ApiFailure { status, message });
    }

    let (data, _message) = unwrap_success(body);
    Ok(data.unwrap_or(Value::Null))
}

#[cfg(test)]
#[path = "api_client_test.rs"]
mod tests;
