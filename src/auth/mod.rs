// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Types and pure rules shared by the session manager and the presentation
//! layer.
//!
//! ## Permission Model
//!
//! 1. The identity provider authenticates the user and yields an [`Identity`]
//! 2. The profile store maps that identity to a [`Profile`] carrying a [`Role`]
//! 3. Gating code asks the resolver whether the profile satisfies a role:
//!    - ranked: `customer < staff < location_admin < super_admin`
//!    - `is_super_admin` is the single exact-match check
//!
//! ## Security
//!
//! - Unrecognized stored roles never satisfy any check
//! - A profile that cannot be loaded is replaced by the lowest role

pub mod credentials;
pub mod error;
pub mod guard;
pub mod identity;
pub mod resolver;
pub mod roles;

pub use error::{AuthError, ProfileError};
pub use guard::{guard, Route, RouteArea, RouteDecision};
pub use identity::{AccountRecord, Attributes, Identity, Profile, ProfileRole, ProviderSession};
pub use resolver::{gate, is_admin, is_super_admin, satisfies, AccessNotice, GateDecision, RoleGate};
pub use roles::{Role, UnknownRole, ROLE_RANKS};
