//! Typed view over the session store.
//!
//! Keys match what the browser console used, so a store exported from one can
//! be read by the other:
//! - `sb-<project-ref>-auth-token`: session blob written by the auth layer
//! - `neocrm_profile` / `neocrm_cliente`: cached profile and tenant records
//! - `selected_cliente_id`: tenant picked by a super admin (see `tenant`)
//! - `app_version`: version that wrote the cache
//! - `theme`: legacy, only ever removed
//!
//! Write failures are logged and swallowed; a broken cache must never block
//! sign-in.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::store::KeyValueStore;
use super::types::{Cliente, Profile, Session};

pub const PROFILE_KEY: &str = "neocrm_profile";
pub const CLIENTE_KEY: &str = "neocrm_cliente";
pub const SELECTED_CLIENTE_KEY: &str = "selected_cliente_id";
pub const VERSION_KEY: &str = "app_version";
pub const THEME_KEY: &str = "theme";

/// Storage key of the session blob for a provider project.
#[must_use]
pub fn session_key(project_ref: &str) -> String {
    format!("sb-{project_ref}-auth-token")
}

/// Project reference derived from the auth provider URL: its first DNS label.
#[must_use]
pub fn project_ref(auth_url: &str) -> Option<String> {
    let url = Url::parse(auth_url).ok()?;
    let label = url.host_str()?.split('.').next()?;
    if label.is_empty() { None } else { Some(label.to_owned()) }
}

/// Token pair read leniently from a session blob, even one without a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
    session_key: String,
}

impl SessionCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, project_ref: &str) -> Self {
        Self { store, session_key: session_key(project_ref) }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    #[must_use]
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    // -- session -------------------------------------------------------------

    #[must_use]
    pub fn load_session(&self) -> Option<Session> {
        self.read_json(&self.session_key)
    }

    #[must_use]
    pub fn load_tokens(&self) -> Option<StoredTokens> {
        self.read_json(&self.session_key)
    }

    pub fn save_session(&self, session: &Session) {
        self.write_json(&self.session_key, session);
    }

    // -- profile / tenant ----------------------------------------------------

    #[must_use]
    pub fn load_profile(&self) -> Option<Profile> {
        self.read_json(PROFILE_KEY)
    }

    pub fn save_profile(&self, profile: &Profile) {
        self.write_json(PROFILE_KEY, profile);
    }

    #[must_use]
    pub fn load_cliente(&self) -> Option<Cliente> {
        self.read_json(CLIENTE_KEY)
    }

    pub fn save_cliente(&self, cliente: Option<&Cliente>) {
        match cliente {
            Some(c) => self.write_json(CLIENTE_KEY, c),
            None => self.remove(CLIENTE_KEY),
        }
    }

    /// Drop the session blob and the cached profile and tenant record.
    ///
    /// The selected tenant id is left alone; it outlives sessions.
    pub fn clear_auth(&self) {
        for key in [self.session_key.as_str(), PROFILE_KEY, CLIENTE_KEY] {
            self.remove(key);
        }
    }

    /// Invalidate caches written by a different app version.
    ///
    /// Returns `true` when the stored version differed (or was absent).
    pub fn reconcile_version(&self, current: &str) -> bool {
        if self.store.get(VERSION_KEY).as_deref() == Some(current) {
            return false;
        }
        tracing::info!(version = current, "app version changed; dropping cached profile");
        for key in [PROFILE_KEY, CLIENTE_KEY, THEME_KEY] {
            self.remove(key);
        }
        self.write(VERSION_KEY, current);
        true
    }

    // -- plumbing ------------------------------------------------------------

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write(key, &raw),
            Err(e) => tracing::warn!(key, error = %e, "cache entry not serializable"),
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "cache remove failed");
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
