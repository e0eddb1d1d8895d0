//! Seams to the hosted auth provider and the profile/tenant directory.
//!
//! `AuthContext` only talks to these traits; the Supabase implementation lives
//! in `supabase`, tests supply scripted fakes.

use tokio::sync::broadcast;

use super::types::{Cliente, Profile, Session};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Request(String),
    #[error("auth provider rejected the call: status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("auth response parse failed: {0}")]
    Parse(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("no active session")]
    NoSession,
}

/// Auth-state notifications, delivered in the order the provider emits them.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    UserUpdated(Session),
}

impl AuthEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialSession(_) => "INITIAL_SESSION",
            Self::SignedIn(_) => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed(_) => "TOKEN_REFRESHED",
            Self::UserUpdated(_) => "USER_UPDATED",
        }
    }
}

#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session as the provider knows it, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Re-establish a session from a stored token pair.
    ///
    /// `expires_at` is the stored expiry (unix seconds), when known.
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: Option<i64>,
    ) -> Result<Session, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    async fn fetch_profile(&self, session: &Session) -> Result<Profile, AuthError>;

    async fn fetch_cliente(&self, session: &Session, cliente_id: &str) -> Result<Cliente, AuthError>;
}
