// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hosted auth backend over HTTPS.
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create account | `POST auth/v1/signup` |
//! | authenticate | `POST auth/v1/token?grant_type=password` |
//! | end session | `POST auth/v1/logout` |
//! | password reset | `POST auth/v1/recover` |
//! | fetch profile | `GET rest/v1/<table>?id=eq.<id>&select=*` |
//!
//! The current session lives in memory only; keeping it across restarts is
//! the host application's concern. Sign-in and sign-out are broadcast on the
//! change stream after the backend confirms them.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use url::Url;

use super::{AuthChange, IdentityProvider, ProfileStore, CHANGE_CHANNEL_CAPACITY};
use crate::auth::{
    AccountRecord, Attributes, AuthError, Identity, Profile, ProfileError, ProviderSession,
};
use crate::config::ProviderConfig;

/// Accept header that makes the REST layer return a single object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl UserBody {
    fn into_identity(self) -> Identity {
        Identity::new(self.id, self.email.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserBody,
}

impl TokenBody {
    fn into_session(self) -> ProviderSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));
        ProviderSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into_identity(),
        }
    }
}

/// Reduce a provider error body to one message.
fn provider_message(status: StatusCode, body: &Value) -> String {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn parse_session(body: Value) -> Result<ProviderSession, AuthError> {
    serde_json::from_value::<TokenBody>(body)
        .map(TokenBody::into_session)
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

/// Sign-up answers with a full session when no confirmation is required,
/// otherwise with the bare user (sometimes wrapped in `user`).
fn parse_sign_up(body: Value) -> Result<AccountRecord, AuthError> {
    if body.get("access_token").is_some() {
        let token: TokenBody =
            serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let created_at = token.user.created_at.unwrap_or_else(Utc::now);
        let session = token.into_session();
        return Ok(AccountRecord {
            user: session.user.clone(),
            session: Some(session),
            created_at,
        });
    }

    let user_value = match body.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => body,
    };
    let user: UserBody = serde_json::from_value(user_value)
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    let created_at = user.created_at.unwrap_or_else(Utc::now);
    Ok(AccountRecord {
        user: user.into_identity(),
        session: None,
        created_at,
    })
}

/// Shared connection to the hosted backend.
pub struct HttpBackend {
    base_url: Url,
    api_key: String,
    profile_table: String,
    http: Client,
    session: RwLock<Option<ProviderSession>>,
    changes: broadcast::Sender<AuthChange>,
}

impl HttpBackend {
    pub fn new(config: &ProviderConfig) -> Result<Arc<Self>, AuthError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("failed to build HTTP client: {e}")))?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Arc::new(Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            profile_table: config.profile_table.clone(),
            http,
            session: RwLock::new(None),
            changes,
        }))
    }

    pub fn identity_provider(self: &Arc<Self>) -> HttpIdentityProvider {
        HttpIdentityProvider {
            backend: Arc::clone(self),
        }
    }

    pub fn profile_store(self: &Arc<Self>) -> HttpProfileStore {
        HttpProfileStore {
            backend: Arc::clone(self),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::InvalidInput(format!("invalid endpoint {path}: {e}")))
    }

    fn profile_url(&self, user_id: &str) -> Result<Url, ProfileError> {
        let mut url = self
            .base_url
            .join(&format!("rest/v1/{}", self.profile_table))
            .map_err(|e| ProfileError::InvalidResponse(format!("invalid profile URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", "*");
        Ok(url)
    }

    async fn bearer(&self) -> String {
        match &*self.session.read().await {
            Some(session) => session.access_token.clone(),
            None => self.api_key.clone(),
        }
    }

    async fn post_json(
        &self,
        url: Url,
        body: &Value,
        bearer: &str,
    ) -> Result<Value, AuthError> {
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let parsed = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !status.is_success() {
            return Err(AuthError::Provider(provider_message(status, &parsed)));
        }
        Ok(parsed)
    }

    async fn install_session(&self, session: ProviderSession) {
        *self.session.write().await = Some(session.clone());
        if self.changes.send(AuthChange::signed_in(session)).is_err() {
            debug!("No subscribers for auth change");
        }
    }

    async fn clear_session(&self) {
        *self.session.write().await = None;
        if self.changes.send(AuthChange::signed_out()).is_err() {
            debug!("No subscribers for auth change");
        }
    }
}

/// Identity provider half of [`HttpBackend`].
#[derive(Clone)]
pub struct HttpIdentityProvider {
    backend: Arc<HttpBackend>,
}

impl IdentityProvider for HttpIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        attributes: &Attributes,
    ) -> Result<AccountRecord, AuthError> {
        let backend = &self.backend;
        let url = backend.endpoint("auth/v1/signup")?;
        let body = json!({
            "email": email,
            "password": password,
            "data": attributes,
        });
        let response = backend.post_json(url, &body, &backend.api_key).await?;
        let record = parse_sign_up(response)?;

        info!(user_id = %record.user.id, confirmed = record.session.is_some(), "Account created");
        if let Some(session) = &record.session {
            backend.install_session(session.clone()).await;
        }
        Ok(record)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        let backend = &self.backend;
        let mut url = backend.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let body = json!({ "email": email, "password": password });

        let response = backend.post_json(url, &body, &backend.api_key).await?;
        let session = parse_session(response)?;
        backend.install_session(session.clone()).await;
        Ok(session)
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        let backend = &self.backend;
        let token = backend
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone());

        if let Some(token) = token {
            let url = backend.endpoint("auth/v1/logout")?;
            backend.post_json(url, &Value::Null, &token).await?;
        }
        backend.clear_session().await;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let backend = &self.backend;
        let url = backend.endpoint("auth/v1/recover")?;
        backend
            .post_json(url, &json!({ "email": email }), &backend.api_key)
            .await?;
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<ProviderSession>, AuthError> {
        Ok(self.backend.session.read().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.backend.changes.subscribe()
    }
}

/// Profile store half of [`HttpBackend`].
#[derive(Clone)]
pub struct HttpProfileStore {
    backend: Arc<HttpBackend>,
}

impl ProfileStore for HttpProfileStore {
    async fn fetch_profile_by_user_id(&self, user_id: &str) -> Result<Profile, ProfileError> {
        let backend = &self.backend;
        let url = backend.profile_url(user_id)?;
        let bearer = backend.bearer().await;

        let response = backend
            .http
            .get(url)
            .header("apikey", &backend.api_key)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        let status = response.status();
        // 406 is how the REST layer reports "no row" for a single-object request.
        if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_ACCEPTABLE {
            return Err(ProfileError::NotFound(user_id.to_string()));
        }
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(ProfileError::Transport(provider_message(status, &body)));
        }

        response
            .json::<Profile>()
            .await
            .map_err(|e| ProfileError::InvalidResponse(e.to_string()))
    }
}
