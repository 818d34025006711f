// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Provider Change Listener
//!
//! Background task that feeds the identity provider's change stream into the
//! session manager.
//!
//! The listener never waits on a profile fetch or session check; those run as
//! their own tasks so the next notification is applied as soon as it arrives.
//!
//! ## Lag
//!
//! The change stream is a bounded broadcast channel. If the listener falls
//! behind, the skipped notifications are unrecoverable and whatever is still
//! buffered is older than the provider's current state. The listener drops
//! the backlog and asks the provider for its current session instead.
//!
//! ## Shutdown
//!
//! Stops on `CancellationToken` cancellation or when the provider drops its
//! sender. The receiver is dropped on exit, unsubscribing from the provider.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::manager::SessionManager;
use crate::providers::{AuthChange, IdentityProvider, ProfileStore};

pub(crate) struct ChangeListener<P, S> {
    manager: SessionManager<P, S>,
    changes: broadcast::Receiver<AuthChange>,
}

impl<P: IdentityProvider, S: ProfileStore> ChangeListener<P, S> {
    pub(crate) fn new(
        manager: SessionManager<P, S>,
        changes: broadcast::Receiver<AuthChange>,
    ) -> Self {
        Self { manager, changes }
    }

    /// Run until cancelled or the provider closes its change stream.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        info!("Auth change listener starting");

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Auth change listener shutting down");
                    return;
                }
                received = self.changes.recv() => received,
            };

            match received {
                Ok(change) => self.manager.handle_auth_change(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth change listener lagged, re-checking session");
                    self.changes = self.changes.resubscribe();
                    let manager = self.manager.clone();
                    tokio::spawn(async move { manager.check_session().await });
                }
                Err(RecvError::Closed) => {
                    info!("Auth change stream closed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Identity, Profile, Role};
    use crate::providers::{
        InMemoryIdentityProvider, InMemoryProfileStore, CHANGE_CHANNEL_CAPACITY,
    };
    use crate::session::DevTools;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn lagged_listener_recovers_current_session() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let profiles = Arc::new(InMemoryProfileStore::new());
        let identity = provider.register_confirmed("ana@example.com", "secret").await;
        profiles
            .insert(identity.id.clone(), Profile::with_role(Role::Staff))
            .await;

        let manager = SessionManager::new(provider.clone(), profiles.clone(), DevTools::Disabled);
        let listener = ChangeListener::new(manager.clone(), provider.subscribe());

        // Overflow the channel before the listener runs, then leave the
        // provider holding a real session.
        for i in 0..=CHANGE_CHANNEL_CAPACITY {
            provider.emit(AuthChange::signed_in(crate::auth::ProviderSession::new(
                format!("t{i}"),
                Identity::new(format!("ghost-{i}"), "ghost@example.com"),
            )));
        }
        provider.restore_session(identity.clone()).await;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(listener.run(shutdown.clone()));

        let mut rx = manager.subscribe();
        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| !s.loading && s.user.as_ref() == Some(&identity)),
        )
        .await
        .expect("listener did not recover")
        .unwrap();
        drop(rx);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn notifications_are_applied_while_a_fetch_is_held() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let profiles = Arc::new(InMemoryProfileStore::new());
        let manager = SessionManager::new(provider.clone(), profiles.clone(), DevTools::Disabled);
        profiles.hold_fetches();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(
            ChangeListener::new(manager.clone(), provider.subscribe()).run(shutdown.clone()),
        );

        let ana = Identity::new("ana", "ana@example.com");
        provider.emit(AuthChange::signed_in(crate::auth::ProviderSession::new(
            "t1",
            ana.clone(),
        )));
        let mut rx = manager.subscribe();
        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| s.loading && s.user.as_ref() == Some(&ana)),
        )
        .await
        .expect("sign-in not applied")
        .unwrap();

        provider.emit(AuthChange::signed_out());
        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| !s.loading && s.user.is_none()),
        )
        .await
        .expect("sign-out queued behind the held fetch")
        .unwrap();
        drop(rx);

        profiles.release_fetches();
        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn listener_stops_when_stream_closes() {
        let manager = SessionManager::new(
            Arc::new(InMemoryIdentityProvider::new()),
            Arc::new(InMemoryProfileStore::new()),
            DevTools::Disabled,
        );
        let (sender, changes) = broadcast::channel(4);
        let listener = ChangeListener::new(manager, changes);
        drop(sender);

        tokio::time::timeout(
            Duration::from_secs(2),
            listener.run(CancellationToken::new()),
        )
        .await
        .expect("listener did not stop");
    }
}
