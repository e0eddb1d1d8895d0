//! Supabase auth (GoTrue) and PostgREST client.
//!
//! Thin HTTP wrapper over the handful of endpoints the console needs:
//! - `POST /auth/v1/token?grant_type=password|refresh_token`
//! - `GET /auth/v1/user`
//! - `POST /auth/v1/logout`
//! - `GET /rest/v1/profiles` and `GET /rest/v1/clientes` filtered by id
//!
//! The in-memory session is the provider's own view; persistence is the
//! caller's job (`AuthContext` writes it to the session cache). Response
//! parsing is kept in pure functions for testability.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use super::provider::{AuthError, AuthEvent, AuthProvider, Directory};
use super::types::{AuthUser, Cliente, Profile, Session};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;
/// Refresh this many seconds before the access token expires.
const EXPIRY_LEEWAY_SECS: i64 = 60;
const EVENT_CAPACITY: usize = 32;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    /// Load from `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    /// Returns `None` if either is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").ok()?;
        Some(Self { url: url.trim_end_matches('/').to_owned(), anon_key })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { http, config, current: Mutex::new(None), events })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Url::parse(&format!("{}{path}", self.config.url)).map_err(|e| AuthError::Request(e.to_string()))
    }

    fn current(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn replace_current(&self, session: Option<Session>) {
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = session;
    }

    fn emit(&self, event: AuthEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let mut url = self.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let resp = self
            .http
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let text = read_success(resp).await?;
        parse_token_response(&text, now_secs())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let resp = self
            .http
            .get(self.endpoint("/auth/v1/user")?)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let text = read_success(resp).await?;
        serde_json::from_str(&text).map_err(|e| AuthError::Parse(e.to_string()))
    }

    async fn select_by_id<T: DeserializeOwned>(
        &self,
        session: &Session,
        table: &str,
        id: &str,
    ) -> Result<T, AuthError> {
        let mut url = self.endpoint(&format!("/rest/v1/{table}"))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("select", "*");
        let resp = self
            .http
            .get(url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let text = read_success(resp).await?;
        parse_single_row(&text, table)
    }
}

#[async_trait::async_trait]
impl AuthProvider for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.is_expired(now_secs(), EXPIRY_LEEWAY_SECS) {
            return Ok(Some(session));
        }
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.replace_current(Some(fresh.clone()));
                self.emit(AuthEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) => {
                self.replace_current(None);
                self.emit(AuthEvent::SignedOut);
                Err(e)
            }
        }
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: Option<i64>,
    ) -> Result<Session, AuthError> {
        // Without a known, still valid expiry the access token cannot be
        // trusted to refresh later; trade it in now.
        let known_fresh = expires_at.is_some_and(|exp| now_secs() + EXPIRY_LEEWAY_SECS < exp);
        let session = if known_fresh {
            match self.fetch_user(access_token).await {
                Ok(user) => Session {
                    access_token: access_token.to_owned(),
                    refresh_token: refresh_token.to_owned(),
                    expires_at,
                    user,
                },
                Err(AuthError::Rejected { status: 401 | 403, .. }) => self.refresh(refresh_token).await?,
                Err(e) => return Err(e),
            }
        } else {
            self.refresh(refresh_token).await?
        };
        self.replace_current(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self
            .token_grant("password", serde_json::json!({ "email": email, "password": password }))
            .await?;
        self.replace_current(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // The local session goes first so a caller giving up on the server
        // call still ends up signed out.
        let taken = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        self.emit(AuthEvent::SignedOut);
        let Some(session) = taken else {
            return Ok(());
        };
        let resp = self
            .http
            .post(self.endpoint("/auth/v1/logout")?)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        read_success(resp).await.map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait::async_trait]
impl Directory for SupabaseClient {
    async fn fetch_profile(&self, session: &Session) -> Result<Profile, AuthError> {
        self.select_by_id(session, "profiles", &session.user.id).await
    }

    async fn fetch_cliente(&self, session: &Session, cliente_id: &str) -> Result<Cliente, AuthError> {
        self.select_by_id(session, "clientes", cliente_id).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

async fn read_success(resp: reqwest::Response) -> Result<String, AuthError> {
    let status = resp.status().as_u16();
    let text = resp
        .text()
        .await
        .map_err(|e| AuthError::Request(e.to_string()))?;
    if (200..300).contains(&status) {
        Ok(text)
    } else {
        Err(AuthError::Rejected { status, message: error_message(&text) })
    }
}

fn parse_token_response(json: &str, now: i64) -> Result<Session, AuthError> {
    let token: TokenResponse = serde_json::from_str(json).map_err(|e| AuthError::Parse(e.to_string()))?;
    let expires_at = token
        .expires_at
        .or_else(|| token.expires_in.map(|secs| now + secs));
    Ok(Session {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at,
        user: token.user,
    })
}

fn parse_single_row<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, AuthError> {
    let mut rows: Vec<T> = serde_json::from_str(json).map_err(|e| AuthError::Parse(e.to_string()))?;
    if rows.is_empty() {
        return Err(AuthError::NotFound(what.to_owned()));
    }
    Ok(rows.swap_remove(0))
}

/// GoTrue and PostgREST use different error keys; take the first present.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_owned();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map_or_else(|| body.trim().to_owned(), str::to_owned)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
