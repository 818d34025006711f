// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

/// Error returned by the auth operations of the session manager.
///
/// Provider rejections carry the provider's message verbatim so the
/// presentation layer can show it as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The identity provider rejected the request
    #[error("{0}")]
    Provider(String),

    /// Input failed local validation before reaching the provider
    #[error("{0}")]
    InvalidInput(String),

    /// The provider could not be reached
    #[error("Auth request failed: {0}")]
    Transport(String),

    /// The provider answered with something we could not read
    #[error("Auth response was invalid: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Provider(_) => "provider_error",
            AuthError::InvalidInput(_) => "invalid_input",
            AuthError::Transport(_) => "transport_error",
            AuthError::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }
}

/// Error returned by a profile store.
///
/// Never surfaced past the session manager: a failed fetch is replaced by
/// the default low-privilege profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// No profile row exists for the user
    #[error("No profile found for user {0}")]
    NotFound(String),

    /// The store could not be reached
    #[error("Profile request failed: {0}")]
    Transport(String),

    /// The store answered with something we could not read
    #[error("Profile response was invalid: {0}")]
    InvalidResponse(String),
}

impl ProfileError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProfileError::NotFound(_) => "profile_not_found",
            ProfileError::Transport(_) => "transport_error",
            ProfileError::InvalidResponse(_) => "invalid_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_is_verbatim() {
        let err = AuthError::Provider("Invalid login credentials".to_string());
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(err.error_code(), "provider_error");
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(AuthError::Transport("timeout".into()).is_retryable());
        assert!(!AuthError::Provider("nope".into()).is_retryable());
        assert!(!AuthError::InvalidInput("empty".into()).is_retryable());
    }

    #[test]
    fn profile_error_display() {
        let err = ProfileError::NotFound("user_1".into());
        assert_eq!(err.to_string(), "No profile found for user user_1");
        assert_eq!(err.error_code(), "profile_not_found");
    }
}
