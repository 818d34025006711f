// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory identity provider and profile store.
//!
//! Used by tests and for running the client without a backend. Behaves like
//! the hosted provider where the session manager can observe it: sign-in and
//! sign-out are announced on the change stream, and new accounts need email
//! confirmation before a session exists unless that is switched off.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{AuthChange, IdentityProvider, ProfileStore, CHANGE_CHANNEL_CAPACITY};
use crate::auth::{
    AccountRecord, Attributes, AuthError, Identity, Profile, ProfileError, ProviderSession,
};

/// Lifetime of sessions issued by the in-memory provider.
const SESSION_TTL_SECS: i64 = 3600;

struct Account {
    identity: Identity,
    password: String,
    confirmed: bool,
    attributes: Attributes,
}

#[derive(Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    session: Option<ProviderSession>,
    sign_out_failure: Option<String>,
    reset_requests: Vec<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_session(identity: Identity) -> ProviderSession {
    ProviderSession {
        access_token: format!("mem-access-{}", Uuid::new_v4()),
        refresh_token: Some(format!("mem-refresh-{}", Uuid::new_v4())),
        expires_at: Some(Utc::now() + Duration::seconds(SESSION_TTL_SECS)),
        user: identity,
    }
}

pub struct InMemoryIdentityProvider {
    state: RwLock<ProviderState>,
    changes: broadcast::Sender<AuthChange>,
    sign_out_gate: watch::Sender<bool>,
    require_confirmation: bool,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (sign_out_gate, _) = watch::channel(true);
        Self {
            state: RwLock::new(ProviderState::default()),
            changes,
            sign_out_gate,
            require_confirmation: true,
        }
    }

    /// New accounts get a session immediately.
    pub fn without_email_confirmation(mut self) -> Self {
        self.require_confirmation = false;
        self
    }

    /// Seed a confirmed account.
    pub async fn register_confirmed(&self, email: &str, password: &str) -> Identity {
        let identity = Identity::new(Uuid::new_v4().to_string(), normalize_email(email));
        self.state.write().await.accounts.insert(
            normalize_email(email),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
                confirmed: true,
                attributes: Attributes::new(),
            },
        );
        identity
    }

    /// Mark an account's email as confirmed. Returns false for unknown emails.
    pub async fn confirm_email(&self, email: &str) -> bool {
        match self.state.write().await.accounts.get_mut(&normalize_email(email)) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Install a session without announcing it, as if persisted from an
    /// earlier run.
    pub async fn restore_session(&self, identity: Identity) -> ProviderSession {
        let session = issue_session(identity);
        self.state.write().await.session = Some(session.clone());
        session
    }

    /// Make `end_session` fail with `message` until cleared with `None`.
    pub async fn set_sign_out_failure(&self, message: Option<&str>) {
        self.state.write().await.sign_out_failure = message.map(str::to_string);
    }

    /// Park `end_session` calls until [`release_sign_out`](Self::release_sign_out).
    pub fn hold_sign_out(&self) {
        self.sign_out_gate.send_replace(false);
    }

    pub fn release_sign_out(&self) {
        self.sign_out_gate.send_replace(true);
    }

    /// Attributes stored at sign-up.
    pub async fn attributes(&self, email: &str) -> Option<Attributes> {
        self.state
            .read()
            .await
            .accounts
            .get(&normalize_email(email))
            .map(|account| account.attributes.clone())
    }

    /// Emails for which a password reset was requested, oldest first.
    pub async fn reset_requests(&self) -> Vec<String> {
        self.state.read().await.reset_requests.clone()
    }

    /// Number of live change-stream subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Publish a change notification to every subscriber.
    pub fn emit(&self, change: AuthChange) {
        if self.changes.send(change).is_err() {
            debug!("No subscribers for auth change");
        }
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        attributes: &Attributes,
    ) -> Result<AccountRecord, AuthError> {
        let key = normalize_email(email);
        let record = {
            let mut state = self.state.write().await;
            if state.accounts.contains_key(&key) {
                return Err(AuthError::Provider("User already registered".to_string()));
            }

            let identity = Identity::new(Uuid::new_v4().to_string(), key.clone());
            state.accounts.insert(
                key,
                Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                    confirmed: !self.require_confirmation,
                    attributes: attributes.clone(),
                },
            );

            let session = (!self.require_confirmation).then(|| issue_session(identity.clone()));
            if session.is_some() {
                state.session = session.clone();
            }

            AccountRecord {
                user: identity,
                session,
                created_at: Utc::now(),
            }
        };

        if let Some(session) = &record.session {
            self.emit(AuthChange::signed_in(session.clone()));
        }
        Ok(record)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        let session = {
            let mut state = self.state.write().await;
            let account = state
                .accounts
                .get(&normalize_email(email))
                .filter(|account| account.password == password)
                .ok_or_else(|| AuthError::Provider("Invalid login credentials".to_string()))?;

            if !account.confirmed {
                return Err(AuthError::Provider("Email not confirmed".to_string()));
            }

            let session = issue_session(account.identity.clone());
            state.session = Some(session.clone());
            session
        };

        self.emit(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        let mut gate = self.sign_out_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        {
            let mut state = self.state.write().await;
            if let Some(message) = &state.sign_out_failure {
                return Err(AuthError::Provider(message.clone()));
            }
            state.session = None;
        }

        self.emit(AuthChange::signed_out());
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.state
            .write()
            .await
            .reset_requests
            .push(normalize_email(email));
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<ProviderSession>, AuthError> {
        Ok(self.state.read().await.session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

/// Profile rows keyed by user ID.
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    failure: RwLock<Option<String>>,
    gate: watch::Sender<bool>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            profiles: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            gate,
        }
    }

    pub async fn insert(&self, user_id: impl Into<String>, profile: Profile) {
        self.profiles.write().await.insert(user_id.into(), profile);
    }

    /// Make every fetch fail with a transport error until cleared with `None`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    /// Park fetches until [`release_fetches`](Self::release_fetches).
    pub fn hold_fetches(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_fetches(&self) {
        self.gate.send_replace(true);
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for InMemoryProfileStore {
    async fn fetch_profile_by_user_id(&self, user_id: &str) -> Result<Profile, ProfileError> {
        let mut gate = self.gate.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = gate.wait_for(|open| *open).await;

        if let Some(message) = self.failure.read().await.clone() {
            return Err(ProfileError::Transport(message));
        }

        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::providers::AuthEvent;

    #[tokio::test]
    async fn sign_up_requires_confirmation_by_default() {
        let provider = InMemoryIdentityProvider::new();
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), "Ana".into());
        let record = provider
            .create_account("New@Example.com", "secret", &attributes)
            .await
            .unwrap();
        assert!(record.session.is_none());
        assert_eq!(record.user.email, "new@example.com");
        assert_eq!(provider.attributes("new@example.com").await, Some(attributes));

        let err = provider.authenticate("new@example.com", "secret").await.unwrap_err();
        assert_eq!(err, AuthError::Provider("Email not confirmed".to_string()));

        assert!(provider.confirm_email("new@example.com").await);
        assert!(provider.authenticate("new@example.com", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let provider = InMemoryIdentityProvider::new();
        provider.register_confirmed("a@example.com", "secret").await;
        let err = provider
            .create_account("a@example.com", "secret", &Attributes::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[tokio::test]
    async fn sign_up_without_confirmation_announces_session() {
        let provider = InMemoryIdentityProvider::new().without_email_confirmation();
        let mut changes = provider.subscribe();
        let record = provider
            .create_account("a@example.com", "secret", &Attributes::new())
            .await
            .unwrap();
        assert!(record.session.is_some());

        let change = changes.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedIn);
        assert_eq!(change.session.unwrap().user, record.user);
    }

    #[tokio::test]
    async fn sign_in_and_out_are_announced() {
        let provider = InMemoryIdentityProvider::new();
        let identity = provider.register_confirmed("a@example.com", "secret").await;
        let mut changes = provider.subscribe();

        let session = provider.authenticate("a@example.com", "secret").await.unwrap();
        assert_eq!(session.user, identity);
        assert_eq!(changes.recv().await.unwrap().event, AuthEvent::SignedIn);
        assert_eq!(provider.current_session().await.unwrap(), Some(session));

        provider.end_session().await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), AuthChange::signed_out());
        assert_eq!(provider.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let provider = InMemoryIdentityProvider::new();
        provider.register_confirmed("a@example.com", "secret").await;
        let err = provider.authenticate("a@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_out_failure_keeps_session() {
        let provider = InMemoryIdentityProvider::new();
        let identity = provider.register_confirmed("a@example.com", "secret").await;
        provider.restore_session(identity).await;
        provider.set_sign_out_failure(Some("network down")).await;

        let err = provider.end_session().await.unwrap_err();
        assert_eq!(err, AuthError::Provider("network down".to_string()));
        assert!(provider.current_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn held_sign_out_waits_for_release() {
        let provider = std::sync::Arc::new(InMemoryIdentityProvider::new());
        let identity = provider.register_confirmed("a@example.com", "secret").await;
        provider.restore_session(identity).await;
        provider.hold_sign_out();

        let pending = tokio::spawn({
            let provider = provider.clone();
            async move { provider.end_session().await }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());
        assert!(provider.current_session().await.unwrap().is_some());

        provider.release_sign_out();
        pending.await.unwrap().unwrap();
        assert!(provider.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_requests_are_recorded() {
        let provider = InMemoryIdentityProvider::new();
        provider.request_password_reset(" A@Example.com").await.unwrap();
        assert_eq!(provider.reset_requests().await, vec!["a@example.com".to_string()]);
    }

    #[tokio::test]
    async fn profile_store_returns_rows_and_errors() {
        let store = InMemoryProfileStore::new();
        store.insert("u1", Profile::with_role(Role::Staff)).await;

        let profile = store.fetch_profile_by_user_id("u1").await.unwrap();
        assert_eq!(profile.role(), Some(Role::Staff));

        let missing = store.fetch_profile_by_user_id("u2").await.unwrap_err();
        assert_eq!(missing, ProfileError::NotFound("u2".to_string()));

        store.set_failure(Some("offline")).await;
        let failed = store.fetch_profile_by_user_id("u1").await.unwrap_err();
        assert_eq!(failed, ProfileError::Transport("offline".to_string()));
    }

    #[tokio::test]
    async fn held_fetches_wait_for_release() {
        let store = std::sync::Arc::new(InMemoryProfileStore::new());
        store.insert("u1", Profile::with_role(Role::Staff)).await;
        store.hold_fetches();

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_profile_by_user_id("u1").await }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        store.release_fetches();
        let profile = pending.await.unwrap().unwrap();
        assert_eq!(profile.role(), Some(Role::Staff));
    }
}
