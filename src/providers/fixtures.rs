// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canned identities for development impersonation.
//!
//! One fixture per role. The IDs are fixed strings, never valid provider
//! user IDs, so a fixture can't be mistaken for a real account.
//!
//! Only compiled into development builds (`debug_assertions` or the `dev`
//! feature).

use super::DevFixture;
use crate::auth::{Identity, Profile, Role};

struct FixtureSpec {
    role: Role,
    id: &'static str,
    email: &'static str,
    name: &'static str,
}

impl FixtureSpec {
    fn to_fixture(&self) -> DevFixture {
        DevFixture {
            identity: Identity::new(self.id, self.email),
            profile: Profile {
                id: Some(self.id.to_string()),
                role: self.role.into(),
                name: Some(self.name.to_string()),
            },
        }
    }
}

const FIXTURES: [FixtureSpec; 4] = [
    FixtureSpec {
        role: Role::SuperAdmin,
        id: "dev-super-admin",
        email: "admin@example.com",
        name: "Super Admin (Dev)",
    },
    FixtureSpec {
        role: Role::LocationAdmin,
        id: "dev-location-admin",
        email: "manager@example.com",
        name: "Location Manager (Dev)",
    },
    FixtureSpec {
        role: Role::Staff,
        id: "dev-staff",
        email: "staff@example.com",
        name: "Staff Member (Dev)",
    },
    FixtureSpec {
        role: Role::Customer,
        id: "dev-customer",
        email: "customer@example.com",
        name: "Customer (Dev)",
    },
];

/// Fixture-backed identity source.
///
/// Only handed to the session manager when development tooling is enabled
/// for the build; see [`crate::session::DevTools`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureIdentitySource;

impl FixtureIdentitySource {
    pub fn new() -> Self {
        Self
    }

    /// Fixture for `role`, if the table has one.
    pub fn fixture(&self, role: Role) -> Option<DevFixture> {
        FIXTURES
            .iter()
            .find(|spec| spec.role == role)
            .map(FixtureSpec::to_fixture)
    }

    /// Roles offered by the role switcher, highest first.
    pub fn roles(&self) -> impl Iterator<Item = Role> {
        FIXTURES.iter().map(|spec| spec.role)
    }

    /// Whole table, highest role first.
    pub fn all(&self) -> Vec<DevFixture> {
        FIXTURES.iter().map(FixtureSpec::to_fixture).collect()
    }
}
