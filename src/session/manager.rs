// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Manager
//!
//! Owns the [`SessionState`] and every transition on it.
//!
//! ## Transitions
//!
//! | From | Event | To |
//! |------|-------|----|
//! | start | `start()` | Loading, then session check |
//! | Loading | provider reports a session | AuthenticatedReal (profile fetch) |
//! | Loading | provider reports no session | Unauthenticated |
//! | any | `enable_dev_mode(role)` | AuthenticatedDev |
//! | AuthenticatedDev | `switch_dev_role(role)` | AuthenticatedDev |
//! | AuthenticatedDev | `disable_dev_mode()` | Loading, then session check |
//! | Real/Dev | `end_session()` | Unauthenticated |
//! | any | provider notification while in dev mode | ignored |
//!
//! ## Ordering
//!
//! Each transition runs inside a single `send_if_modified` closure, so no
//! other transition can interleave with it. Provider notifications are
//! applied as soon as the listener receives them; the profile fetch they
//! start runs as its own task, so a later notification is never queued
//! behind it. Session checks, profile fetches and sign-outs record the state
//! epoch when issued and apply their result only if the epoch is unchanged
//! on completion; anything older is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::listener::ChangeListener;
use super::state::SessionState;
use crate::auth::{
    credentials, AccountRecord, Attributes, AuthError, Identity, Profile, ProfileRole,
    ProviderSession, Role, ROLE_RANKS,
};
use crate::config::AuthConfig;
#[cfg(any(debug_assertions, feature = "dev"))]
use crate::providers::FixtureIdentitySource;
use crate::providers::{AuthChange, DevFixture, IdentityProvider, ProfileStore};

/// Development impersonation, chosen when the manager is built.
///
/// `Enabled` only exists in development builds, so a release build has no
/// way to construct an impersonating manager.
#[derive(Debug, Clone, Copy, Default)]
pub enum DevTools {
    /// Dev operations log a warning and do nothing
    #[default]
    Disabled,
    #[cfg(any(debug_assertions, feature = "dev"))]
    Enabled(FixtureIdentitySource),
}

impl DevTools {
    /// Fixture impersonation when this build ships it.
    #[cfg(any(debug_assertions, feature = "dev"))]
    pub fn for_build() -> Self {
        DevTools::Enabled(FixtureIdentitySource::new())
    }

    #[cfg(not(any(debug_assertions, feature = "dev")))]
    pub fn for_build() -> Self {
        DevTools::Disabled
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if config.dev_tools() {
            Self::for_build()
        } else {
            DevTools::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            DevTools::Disabled => false,
            #[cfg(any(debug_assertions, feature = "dev"))]
            DevTools::Enabled(_) => true,
        }
    }

    #[cfg_attr(
        not(any(debug_assertions, feature = "dev")),
        allow(unused_variables)
    )]
    pub fn fixture(&self, role: Role) -> Option<DevFixture> {
        match self {
            DevTools::Disabled => None,
            #[cfg(any(debug_assertions, feature = "dev"))]
            DevTools::Enabled(fixtures) => fixtures.fixture(role),
        }
    }

    /// Whole fixture table, highest role first. Empty when disabled.
    pub fn fixtures(&self) -> Vec<DevFixture> {
        match self {
            DevTools::Disabled => Vec::new(),
            #[cfg(any(debug_assertions, feature = "dev"))]
            DevTools::Enabled(fixtures) => fixtures.all(),
        }
    }
}

struct Inner<P, S> {
    provider: P,
    profiles: S,
    dev: DevTools,
    state: watch::Sender<SessionState>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

/// Process-wide session owner. Cheap to clone; clones share state.
pub struct SessionManager<P, S> {
    inner: Arc<Inner<P, S>>,
}

impl<P, S> Clone for SessionManager<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: IdentityProvider, S: ProfileStore> SessionManager<P, S> {
    pub fn new(provider: P, profiles: S, dev: DevTools) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                profiles,
                dev,
                state,
                shutdown: CancellationToken::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    pub fn from_config(provider: P, profiles: S, config: &AuthConfig) -> Self {
        Self::new(provider, profiles, DevTools::from_config(config))
    }

    /// Subscribe to provider changes and run the initial session check.
    ///
    /// Must be called from within a Tokio runtime. Later calls are no-ops.
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("Session manager already started");
            return;
        }

        let changes = self.inner.provider.subscribe();
        tokio::spawn(ChangeListener::new(self.clone(), changes).run(self.inner.shutdown.clone()));
        info!(dev_tools = self.dev_tools_available(), "Session manager started");

        self.check_session().await;
    }

    /// Stop the change listener, dropping the provider subscription.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    // ==========================================
    // STATE
    // ==========================================

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn user(&self) -> Option<Identity> {
        self.inner.state.borrow().user.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.borrow().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn is_dev_mode(&self) -> bool {
        self.inner.state.borrow().dev_mode
    }

    pub fn dev_tools_available(&self) -> bool {
        self.inner.dev.is_enabled()
    }

    /// Fixture table offered by the role switcher; empty without dev tools.
    pub fn dev_fixtures(&self) -> Vec<DevFixture> {
        self.inner.dev.fixtures()
    }

    pub fn role_ranks(&self) -> &'static [(Role, u8)] {
        &ROLE_RANKS
    }

    // ==========================================
    // PERMISSION HELPERS
    // ==========================================

    pub fn has_role(&self, required: Role) -> bool {
        self.inner.state.borrow().has_role(required)
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    pub fn is_super_admin(&self) -> bool {
        self.inner.state.borrow().is_super_admin()
    }

    // ==========================================
    // AUTH OPERATIONS
    // ==========================================

    /// Create an account. Never changes the session; the provider usually
    /// wants the email confirmed before a session exists.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        attributes: &Attributes,
    ) -> Result<AccountRecord, AuthError> {
        credentials::validate_sign_up(email, password, None)?;
        self.inner
            .provider
            .create_account(email, password, attributes)
            .await
            .inspect(|record| info!(user_id = %record.user.id, "Account created"))
            .inspect_err(|e| warn!(error = %e, "Account creation failed"))
    }

    /// Authenticate with the provider.
    ///
    /// Success does not touch the session here; the provider's `SignedIn`
    /// notification drives the transition.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, AuthError> {
        credentials::validate_sign_in(email, password)?;
        self.inner
            .provider
            .authenticate(email, password)
            .await
            .inspect(|session| info!(user_id = %session.user.id, "Signed in"))
            .inspect_err(|e| warn!(error = %e, "Sign-in failed"))
    }

    /// Sign out, leaving dev mode first.
    ///
    /// On provider failure dev mode is already off but `user`/`profile` are
    /// left as they were; treat the error as "session may not be cleared".
    /// If another identity was installed while the provider call was in
    /// flight, that identity is kept.
    pub async fn end_session(&self) -> Result<(), AuthError> {
        let mut issued = 0;
        let left_dev = self.inner.state.send_if_modified(|state| {
            let left = state.dev_mode;
            if left {
                state.dev_mode = false;
                state.epoch += 1;
            }
            issued = state.epoch;
            left
        });
        if left_dev {
            debug!("Dev mode cleared for sign-out");
        }

        if let Err(e) = self.inner.provider.end_session().await {
            warn!(error = %e, "Sign-out failed, local session not cleared");
            return Err(e);
        }

        let cleared = self.inner.state.send_if_modified(|state| {
            if state.epoch != issued {
                return false;
            }
            state.epoch += 1;
            state.user = None;
            state.profile = None;
            state.loading = false;
            true
        });
        if cleared {
            info!("Signed out");
        } else {
            debug!("Session changed during sign-out, keeping it");
        }
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        credentials::validate_reset(email)?;
        self.inner
            .provider
            .request_password_reset(email)
            .await
            .inspect(|()| info!("Password reset requested"))
            .inspect_err(|e| warn!(error = %e, "Password reset request failed"))
    }

    // ==========================================
    // DEV MODE
    // ==========================================

    /// Impersonate `role` with its fixture identity.
    pub fn enable_dev_mode(&self, role: Role) {
        if !self.dev_tools_available() {
            warn!(role = %role, "Dev mode is only available in development builds");
            return;
        }
        let Some(fixture) = self.inner.dev.fixture(role) else {
            warn!(role = %role, "No dev fixture for role");
            return;
        };

        self.inner.state.send_modify(|state| {
            state.epoch += 1;
            state.dev_mode = true;
            state.user = Some(fixture.identity);
            state.profile = Some(fixture.profile);
            state.loading = false;
        });
        info!(role = %role, "Dev mode enabled");
    }

    /// Replace the impersonated identity. No-op outside dev mode.
    pub fn switch_dev_role(&self, role: Role) {
        if !self.dev_tools_available() {
            warn!(role = %role, "Dev mode is only available in development builds");
            return;
        }
        let Some(fixture) = self.inner.dev.fixture(role) else {
            warn!(role = %role, "No dev fixture for role");
            return;
        };

        let switched = self.inner.state.send_if_modified(|state| {
            if !state.dev_mode {
                return false;
            }
            if state.user.as_ref() == Some(&fixture.identity)
                && state.profile.as_ref() == Some(&fixture.profile)
            {
                return false;
            }
            state.user = Some(fixture.identity);
            state.profile = Some(fixture.profile);
            true
        });
        if switched {
            info!(role = %role, "Dev role switched");
        }
    }

    /// Leave dev mode and pick up the real session, if any.
    pub async fn disable_dev_mode(&self) {
        if !self.dev_tools_available() {
            warn!("Dev mode is only available in development builds");
            return;
        }

        let left = self.inner.state.send_if_modified(|state| {
            if !state.dev_mode {
                return false;
            }
            state.epoch += 1;
            state.dev_mode = false;
            state.user = None;
            state.profile = None;
            state.loading = true;
            true
        });
        if !left {
            debug!("Dev mode not active");
            return;
        }

        info!("Dev mode disabled, checking for a real session");
        self.check_session().await;
    }

    // ==========================================
    // PROVIDER-DRIVEN TRANSITIONS
    // ==========================================

    /// Ask the provider for its current session and install it.
    pub(crate) async fn check_session(&self) {
        let issued = self.inner.state.borrow().epoch;

        match self.inner.provider.current_session().await {
            Ok(session) => {
                if let Some((token, user_id)) = self.install_session(session, Some(issued)) {
                    self.load_profile(token, &user_id).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "Session check failed");
                self.inner.state.send_if_modified(|state| {
                    if state.epoch != issued || !state.loading {
                        return false;
                    }
                    state.loading = false;
                    true
                });
            }
        }
    }

    /// Apply a provider notification. The profile fetch it starts runs as a
    /// separate task; must be called from within a Tokio runtime.
    pub(crate) fn handle_auth_change(&self, change: AuthChange) {
        debug!(
            event = ?change.event,
            has_session = change.session.is_some(),
            "Provider auth change"
        );
        if let Some((token, user_id)) = self.install_session(change.session, None) {
            let manager = self.clone();
            tokio::spawn(async move { manager.load_profile(token, &user_id).await });
        }
    }

    /// Install `session` (or its absence). `issued` is the epoch a session
    /// check started under; notifications pass `None` as they are always
    /// current.
    ///
    /// Returns the epoch and user ID to fetch a profile for, if any.
    fn install_session(
        &self,
        session: Option<ProviderSession>,
        issued: Option<u64>,
    ) -> Option<(u64, String)> {
        let mut fetch = None;
        self.inner.state.send_if_modified(|state| {
            if state.dev_mode {
                debug!("Dev mode active, ignoring provider session");
                return false;
            }
            if issued.is_some_and(|epoch| epoch != state.epoch) {
                debug!("Discarding stale session check");
                return false;
            }

            state.epoch += 1;
            match session {
                Some(session) => {
                    fetch = Some((state.epoch, session.user.id.clone()));
                    state.user = Some(session.user);
                    state.profile = None;
                    state.loading = true;
                }
                None => {
                    state.user = None;
                    state.profile = None;
                    state.loading = false;
                }
            }
            true
        });
        fetch
    }

    /// Fetch the profile for `user_id`, substituting the lowest role on any
    /// error.
    async fn load_profile(&self, token: u64, user_id: &str) {
        let profile = match self.inner.profiles.fetch_profile_by_user_id(user_id).await {
            Ok(profile) => {
                match &profile.role {
                    ProfileRole::Known(_) => {}
                    ProfileRole::Unrecognized(raw) => warn!(
                        user_id = %user_id,
                        role = %raw,
                        "Profile has an unrecognized role, no permissions granted"
                    ),
                    ProfileRole::Absent => warn!(
                        user_id = %user_id,
                        "Profile has no role, no permissions granted"
                    ),
                }
                profile
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    code = e.error_code(),
                    "Profile fetch failed, using default profile"
                );
                Profile::fallback()
            }
        };

        let applied = self.inner.state.send_if_modified(|state| {
            if state.dev_mode || state.epoch != token {
                return false;
            }
            state.profile = Some(profile);
            state.loading = false;
            true
        });
        if !applied {
            debug!(user_id = %user_id, "Discarding stale profile fetch");
        }
    }
}
