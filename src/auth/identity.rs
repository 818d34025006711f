// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity, profile and provider session records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::roles::Role;

/// Free-form attributes attached to a new account (e.g. display name).
pub type Attributes = serde_json::Map<String, Value>;

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user ID issued by the identity provider
    pub id: String,

    /// Sign-in email
    #[serde(default)]
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// Role as stored on a profile row.
///
/// Stored roles outside the known tiers are kept verbatim as
/// `Unrecognized` and never satisfy any permission check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ProfileRole {
    Known(Role),
    Unrecognized(String),
    #[default]
    Absent,
}

impl ProfileRole {
    /// The known role, if any.
    pub fn known(&self) -> Option<Role> {
        match self {
            ProfileRole::Known(role) => Some(*role),
            _ => None,
        }
    }

    /// Raw role string as stored, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProfileRole::Known(role) => Some(role.as_str()),
            ProfileRole::Unrecognized(raw) => Some(raw),
            ProfileRole::Absent => None,
        }
    }
}

impl From<Option<String>> for ProfileRole {
    fn from(raw: Option<String>) -> Self {
        match raw {
            None => ProfileRole::Absent,
            Some(raw) if raw.trim().is_empty() => ProfileRole::Absent,
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => ProfileRole::Known(role),
                Err(_) => ProfileRole::Unrecognized(raw),
            },
        }
    }
}

impl From<ProfileRole> for Option<String> {
    fn from(role: ProfileRole) -> Self {
        match role {
            ProfileRole::Known(role) => Some(role.as_str().to_string()),
            ProfileRole::Unrecognized(raw) => Some(raw),
            ProfileRole::Absent => None,
        }
    }
}

impl From<Role> for ProfileRole {
    fn from(role: Role) -> Self {
        ProfileRole::Known(role)
    }
}

/// Permission-bearing record associated with an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Row ID (same as the user ID in the profile store)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Permission tier
    #[serde(default)]
    pub role: ProfileRole,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Profile {
    /// Profile carrying only a role.
    pub fn with_role(role: Role) -> Self {
        Self {
            id: None,
            role: ProfileRole::Known(role),
            name: None,
        }
    }

    /// Stand-in used when the profile store fails: lowest role, nothing else.
    pub fn fallback() -> Self {
        Self::with_role(Role::LOWEST)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The known role, if the stored role is recognized.
    pub fn role(&self) -> Option<Role> {
        self.role.known()
    }
}

/// A live session issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub user: Identity,
}

impl ProviderSession {
    pub fn new(access_token: impl Into<String>, user: Identity) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            user,
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Record returned by the provider after creating an account.
///
/// `session` is `None` when the provider requires email confirmation
/// before the first sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub user: Identity,
    pub session: Option<ProviderSession>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_deserializes_known_role() {
        let profile: Profile =
            serde_json::from_str(r#"{"id":"u1","role":"location_admin","name":"Ana"}"#).unwrap();
        assert_eq!(profile.role(), Some(Role::LocationAdmin));
        assert_eq!(profile.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn profile_keeps_unrecognized_role_verbatim() {
        let profile: Profile = serde_json::from_str(r#"{"role":"owner"}"#).unwrap();
        assert_eq!(profile.role, ProfileRole::Unrecognized("owner".to_string()));
        assert_eq!(profile.role(), None);
        assert_eq!(profile.role.as_str(), Some("owner"));
    }

    #[test]
    fn profile_without_role_is_absent() {
        let missing: Profile = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert_eq!(missing.role, ProfileRole::Absent);

        let null: Profile = serde_json::from_str(r#"{"id":"u1","role":null}"#).unwrap();
        assert_eq!(null.role, ProfileRole::Absent);
    }

    #[test]
    fn profile_role_serializes_as_string() {
        let json = serde_json::to_value(Profile::with_role(Role::Staff)).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "staff" }));
    }

    #[test]
    fn fallback_profile_has_lowest_role() {
        assert_eq!(Profile::fallback().role(), Some(Role::Customer));
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let mut session = ProviderSession::new("secret-access", Identity::new("u1", "a@b.c"));
        session.refresh_token = Some("secret-refresh".to_string());
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("u1"));
    }
}
