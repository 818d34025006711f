// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session
//!
//! Process-wide session state and the manager that owns it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let manager = SessionManager::from_config(provider, profiles, &config);
//! manager.start().await;
//!
//! let mut changes = manager.subscribe();
//! while changes.changed().await.is_ok() {
//!     render(&changes.borrow_and_update());
//! }
//! ```
//!
//! Readers never mutate state; they take a [`SessionState`] snapshot or
//! watch the channel.

mod listener;
pub mod manager;
pub mod state;

pub use manager::{DevTools, SessionManager};
pub use state::{SessionPhase, SessionState};
