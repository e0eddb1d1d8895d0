//! Session, profile and tenant records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw user object returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Access/refresh token pair issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// `true` once `now` (unix seconds) is within `leeway` seconds of expiry.
    #[must_use]
    pub fn is_expired(&self, now: i64, leeway: i64) -> bool {
        self.expires_at.is_some_and(|exp| now + leeway >= exp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Member,
    Viewer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

/// Application-level user record, distinct from [`AuthUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub cliente_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Profile {
    /// Stand-in profile used when the profile record cannot be fetched.
    ///
    /// The display name is the local part of the email; no role, no tenant.
    #[must_use]
    pub fn minimal(user: &AuthUser) -> Self {
        let full_name = user
            .user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| {
                user.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_owned)
            });
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name,
            avatar_url: None,
            role: None,
            cliente_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == Some(Role::SuperAdmin)
    }
}

/// Tenant record. Fields the console does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cliente {
    pub id: String,
    pub nome: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
