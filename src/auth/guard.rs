// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route protection for the two navigation areas.

use crate::session::SessionState;

/// Navigation area a screen belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteArea {
    /// Signed-in part of the app
    App,
    /// Login, sign-up and password reset screens
    Auth,
}

/// Where a redirect sends the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
}

impl Route {
    pub const fn path(self) -> &'static str {
        match self {
            Route::Login => "/(auth)/login",
            Route::Home => "/(app)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session still resolving; show a spinner
    Wait,
    Proceed,
    Redirect(Route),
}

/// Decide whether a screen in `area` may render for `state`.
pub fn guard(area: RouteArea, state: &SessionState) -> RouteDecision {
    match area {
        RouteArea::App if state.loading => RouteDecision::Wait,
        RouteArea::App if state.user.is_none() => RouteDecision::Redirect(Route::Login),
        RouteArea::App => RouteDecision::Proceed,
        RouteArea::Auth if !state.loading && state.user.is_some() => {
            RouteDecision::Redirect(Route::Home)
        }
        RouteArea::Auth => RouteDecision::Proceed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;

    fn state(loading: bool, signed_in: bool) -> SessionState {
        SessionState {
            user: signed_in.then(|| Identity::new("u1", "u1@example.com")),
            loading,
            ..SessionState::default()
        }
    }

    #[test]
    fn app_area_waits_while_loading() {
        assert_eq!(guard(RouteArea::App, &state(true, false)), RouteDecision::Wait);
        assert_eq!(guard(RouteArea::App, &state(true, true)), RouteDecision::Wait);
    }

    #[test]
    fn app_area_redirects_anonymous_users_to_login() {
        assert_eq!(
            guard(RouteArea::App, &state(false, false)),
            RouteDecision::Redirect(Route::Login)
        );
        assert_eq!(Route::Login.path(), "/(auth)/login");
    }

    #[test]
    fn app_area_admits_signed_in_users() {
        assert_eq!(guard(RouteArea::App, &state(false, true)), RouteDecision::Proceed);
    }

    #[test]
    fn auth_area_sends_signed_in_users_home() {
        assert_eq!(
            guard(RouteArea::Auth, &state(false, true)),
            RouteDecision::Redirect(Route::Home)
        );
        assert_eq!(guard(RouteArea::Auth, &state(true, true)), RouteDecision::Proceed);
        assert_eq!(guard(RouteArea::Auth, &state(false, false)), RouteDecision::Proceed);
    }
}
