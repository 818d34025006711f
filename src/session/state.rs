// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The session aggregate shared with the presentation layer.

use crate::auth::{resolver, Identity, Profile, Role};

/// Coarse state of the session, derived from [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Unauthenticated,
    AuthenticatedReal,
    AuthenticatedDev,
}

/// Current identity, profile and flags.
///
/// Only the session manager mutates this; everyone else gets clones through
/// `SessionManager::snapshot` or the watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<Identity>,
    pub profile: Option<Profile>,
    /// True during the session check and while a profile fetch is in flight
    pub loading: bool,
    /// True while a fixture identity is installed
    pub dev_mode: bool,
    /// Bumped by every identity-changing transition. Async completions
    /// issued under an older epoch are discarded.
    pub(crate) epoch: u64,
}

impl Default for SessionState {
    /// State at process start: loading, nobody signed in.
    fn default() -> Self {
        Self {
            user: None,
            profile: None,
            loading: true,
            dev_mode: false,
            epoch: 0,
        }
    }
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading, self.dev_mode) {
            (Some(_), _, true) => SessionPhase::AuthenticatedDev,
            (_, true, _) => SessionPhase::Loading,
            (Some(_), false, false) => SessionPhase::AuthenticatedReal,
            (None, false, _) => SessionPhase::Unauthenticated,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().and_then(Profile::role)
    }

    pub fn has_role(&self, required: Role) -> bool {
        resolver::satisfies(self.profile.as_ref(), required)
    }

    pub fn is_admin(&self) -> bool {
        resolver::is_admin(self.profile.as_ref())
    }

    pub fn is_super_admin(&self) -> bool {
        resolver::is_super_admin(self.profile.as_ref())
    }

    /// Status line for the dev toolbar.
    pub fn status_label(&self) -> String {
        match (self.dev_mode, self.role()) {
            (true, Some(role)) => format!("Mock: {}", role.label()),
            (true, None) => "Mock: none".to_string(),
            (false, _) => "Real Auth".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in(role: Role, dev_mode: bool) -> SessionState {
        SessionState {
            user: Some(Identity::new("u1", "u1@example.com")),
            profile: Some(Profile::with_role(role)),
            loading: false,
            dev_mode,
            epoch: 1,
        }
    }

    #[test]
    fn starts_loading_and_empty() {
        let state = SessionState::default();
        assert!(state.loading);
        assert!(state.user.is_none());
        assert!(state.profile.is_none());
        assert!(!state.dev_mode);
        assert_eq!(state.phase(), SessionPhase::Loading);
    }

    #[test]
    fn phase_follows_flags() {
        assert_eq!(signed_in(Role::Staff, false).phase(), SessionPhase::AuthenticatedReal);
        assert_eq!(signed_in(Role::Staff, true).phase(), SessionPhase::AuthenticatedDev);

        let fetching = SessionState {
            profile: None,
            loading: true,
            ..signed_in(Role::Staff, false)
        };
        assert_eq!(fetching.phase(), SessionPhase::Loading);

        let signed_out = SessionState {
            loading: false,
            ..SessionState::default()
        };
        assert_eq!(signed_out.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn permission_helpers_use_profile() {
        let admin = signed_in(Role::LocationAdmin, false);
        assert!(admin.has_role(Role::Staff));
        assert!(!admin.has_role(Role::SuperAdmin));
        assert!(admin.is_admin());
        assert!(!admin.is_super_admin());
        assert_eq!(admin.role(), Some(Role::LocationAdmin));
    }

    #[test]
    fn status_label_reflects_dev_mode() {
        assert_eq!(signed_in(Role::Staff, true).status_label(), "Mock: Staff");
        assert_eq!(signed_in(Role::Staff, false).status_label(), "Real Auth");
    }
}
