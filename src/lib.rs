// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session Gate - client-side session and role gating
//!
//! Tracks who is signed in, loads their profile and role, and answers
//! permission questions for the presentation layer. Development builds can
//! impersonate any role with fixture identities.
//!
//! ## Modules
//!
//! - `auth` - roles, identity records, role resolution, gates and form checks
//! - `config` - environment configuration
//! - `logging` - tracing subscriber setup
//! - `providers` - identity provider and profile store collaborators
//! - `session` - session state and the session manager

pub mod auth;
pub mod config;
pub mod logging;
pub mod providers;
pub mod session;

pub use auth::{AuthError, Identity, Profile, ProfileError, Role};
pub use config::{AuthConfig, ConfigError};
pub use session::{DevTools, SessionManager, SessionPhase, SessionState};
