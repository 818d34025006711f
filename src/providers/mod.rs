// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Collaborators
//!
//! The session manager talks to two outside systems through these traits:
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`IdentityProvider`] | create account, authenticate, end session, password reset, current session, change stream |
//! | [`ProfileStore`] | fetch profile by user ID |
//!
//! Implementations:
//!
//! - `memory` - in-process provider and store for tests and local runs
//! - `http` - hosted auth REST endpoints plus a `profiles` table
//! - `fixtures` - canned development identities, not a provider; used only
//!   by dev impersonation and compiled only into development builds

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::{
    AccountRecord, Attributes, AuthError, Identity, Profile, ProfileError, ProviderSession,
};

#[cfg(any(debug_assertions, feature = "dev"))]
pub mod fixtures;
pub mod http;
pub mod memory;

#[cfg(any(debug_assertions, feature = "dev"))]
pub use fixtures::FixtureIdentitySource;
pub use http::{HttpBackend, HttpIdentityProvider, HttpProfileStore};
pub use memory::{InMemoryIdentityProvider, InMemoryProfileStore};

/// Identity and profile installed while impersonating one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevFixture {
    pub identity: Identity,
    pub profile: Profile,
}

/// Capacity of provider change channels.
pub const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Kind of session change reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One notification on the provider's change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<ProviderSession>,
}

impl AuthChange {
    pub fn signed_in(session: ProviderSession) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }
}

/// Remote identity provider.
///
/// Implementations that establish or end a session must also publish the
/// matching [`AuthChange`] on the channel returned by [`subscribe`].
///
/// [`subscribe`]: IdentityProvider::subscribe
pub trait IdentityProvider: Send + Sync + 'static {
    fn create_account(
        &self,
        email: &str,
        password: &str,
        attributes: &Attributes,
    ) -> impl Future<Output = Result<AccountRecord, AuthError>> + Send;

    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<ProviderSession, AuthError>> + Send;

    fn end_session(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn request_password_reset(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Session the provider currently holds, if any.
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<ProviderSession>, AuthError>> + Send;

    /// Subscribe to session change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Remote profile store.
pub trait ProfileStore: Send + Sync + 'static {
    fn fetch_profile_by_user_id(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Profile, ProfileError>> + Send;
}

impl<P: IdentityProvider> IdentityProvider for Arc<P> {
    fn create_account(
        &self,
        email: &str,
        password: &str,
        attributes: &Attributes,
    ) -> impl Future<Output = Result<AccountRecord, AuthError>> + Send {
        (**self).create_account(email, password, attributes)
    }

    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<ProviderSession, AuthError>> + Send {
        (**self).authenticate(email, password)
    }

    fn end_session(&self) -> impl Future<Output = Result<(), AuthError>> + Send {
        (**self).end_session()
    }

    fn request_password_reset(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), AuthError>> + Send {
        (**self).request_password_reset(email)
    }

    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<ProviderSession>, AuthError>> + Send {
        (**self).current_session()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        (**self).subscribe()
    }
}

impl<S: ProfileStore> ProfileStore for Arc<S> {
    fn fetch_profile_by_user_id(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Profile, ProfileError>> + Send {
        (**self).fetch_profile_by_user_id(user_id)
    }
}
