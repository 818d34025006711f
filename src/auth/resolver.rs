// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role resolution and gating.
//!
//! Pure functions over a profile. Gating components call these instead of
//! comparing role strings themselves.
//!
//! ## Asymmetry
//!
//! [`is_admin`] is a ranked check (`location_admin` or above) while
//! [`is_super_admin`] is an exact match on `super_admin`. A role ranked above
//! `super_admin`, should one ever be added, would pass `is_admin` but not
//! `is_super_admin`.

use std::fmt;

use super::identity::Profile;
use super::roles::Role;
use crate::session::SessionState;

/// Whether `profile` meets `required` by rank.
///
/// False when there is no profile or its role is not recognized.
pub fn satisfies(profile: Option<&Profile>, required: Role) -> bool {
    profile
        .and_then(Profile::role)
        .is_some_and(|role| role.has_privilege(required))
}

/// Ranked check for `location_admin` or above.
pub fn is_admin(profile: Option<&Profile>) -> bool {
    satisfies(profile, Role::LocationAdmin)
}

/// Exact match on `super_admin`.
pub fn is_super_admin(profile: Option<&Profile>) -> bool {
    profile.and_then(Profile::role) == Some(Role::SuperAdmin)
}

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Session still resolving; render nothing
    Pending,
    /// Render the protected content
    Allow,
    /// Render the fallback
    Deny,
}

/// Decide what a gate shows for `profile` given the loading flag.
pub fn gate(profile: Option<&Profile>, required: Role, loading: bool) -> GateDecision {
    if loading {
        GateDecision::Pending
    } else if satisfies(profile, required) {
        GateDecision::Allow
    } else {
        GateDecision::Deny
    }
}

/// Message shown by a gate configured with [`RoleGate::with_notice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessNotice {
    pub required: Role,
    /// Role string of the current profile, if any
    pub current: Option<String>,
}

impl AccessNotice {
    pub const TITLE: &'static str = "Access Restricted";

    pub fn message(&self) -> String {
        format!(
            "This content requires {} permissions.",
            self.required.as_str().replace('_', " ")
        )
    }

    pub fn current_role(&self) -> String {
        format!("Your role: {}", self.current.as_deref().unwrap_or("none"))
    }
}

impl fmt::Display for AccessNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.message(), self.current_role())
    }
}

/// A reusable gate bound to one required role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGate {
    required: Role,
    show_notice: bool,
}

impl RoleGate {
    pub const fn new(required: Role) -> Self {
        Self {
            required,
            show_notice: false,
        }
    }

    pub const fn staff_only() -> Self {
        Self::new(Role::Staff)
    }

    pub const fn admin_only() -> Self {
        Self::new(Role::LocationAdmin)
    }

    /// Ranked gate at `super_admin`. Unlike [`is_super_admin`] this would
    /// admit a higher role.
    pub const fn super_admin_only() -> Self {
        Self::new(Role::SuperAdmin)
    }

    /// Produce an [`AccessNotice`] instead of the fallback when denied.
    pub const fn with_notice(mut self) -> Self {
        self.show_notice = true;
        self
    }

    pub const fn required(&self) -> Role {
        self.required
    }

    pub fn decide(&self, state: &SessionState) -> GateDecision {
        gate(state.profile.as_ref(), self.required, state.loading)
    }

    /// Evaluate the gate: `None` while pending, `content()` when allowed,
    /// otherwise `fallback`.
    pub fn render<T>(
        &self,
        state: &SessionState,
        content: impl FnOnce() -> T,
        fallback: Option<T>,
    ) -> Option<T> {
        match self.decide(state) {
            GateDecision::Pending => None,
            GateDecision::Allow => Some(content()),
            GateDecision::Deny => fallback,
        }
    }

    /// The notice to show, if this gate is denied and configured for one.
    pub fn notice(&self, state: &SessionState) -> Option<AccessNotice> {
        if !self.show_notice || self.decide(state) != GateDecision::Deny {
            return None;
        }
        Some(AccessNotice {
            required: self.required,
            current: state
                .profile
                .as_ref()
                .and_then(|p| p.role.as_str())
                .map(str::to_string),
        })
    }
}
