// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input checks run before any provider call.

use super::error::AuthError;

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Sign-in needs both fields.
pub fn validate_sign_in(email: &str, password: &str) -> Result<(), AuthError> {
    if is_blank(email) || password.is_empty() {
        return Err(AuthError::InvalidInput(
            "Please fill in all fields".to_string(),
        ));
    }
    Ok(())
}

/// Sign-up needs both fields and a long enough password.
///
/// `confirmation` is checked only when the caller collected one.
pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirmation: Option<&str>,
) -> Result<(), AuthError> {
    if is_blank(email) || password.is_empty() || confirmation.is_some_and(str::is_empty) {
        return Err(AuthError::InvalidInput(
            "Please fill in all required fields".to_string(),
        ));
    }
    if confirmation.is_some_and(|c| c != password) {
        return Err(AuthError::InvalidInput(
            "Passwords do not match".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_reset(email: &str) -> Result<(), AuthError> {
    if is_blank(email) {
        return Err(AuthError::InvalidInput(
            "Please enter your email".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), AuthError>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn sign_in_requires_both_fields() {
        assert!(validate_sign_in("a@example.com", "secret").is_ok());
        assert_eq!(message(validate_sign_in("", "secret")), "Please fill in all fields");
        assert_eq!(message(validate_sign_in("a@example.com", "")), "Please fill in all fields");
        assert_eq!(message(validate_sign_in("   ", "secret")), "Please fill in all fields");
    }

    #[test]
    fn sign_up_checks_length_and_confirmation() {
        assert!(validate_sign_up("a@example.com", "secret", None).is_ok());
        assert!(validate_sign_up("a@example.com", "secret", Some("secret")).is_ok());
        assert_eq!(
            message(validate_sign_up("a@example.com", "short", None)),
            "Password must be at least 6 characters"
        );
        assert_eq!(
            message(validate_sign_up("a@example.com", "secret", Some("secreT"))),
            "Passwords do not match"
        );
        assert_eq!(
            message(validate_sign_up("a@example.com", "secret", Some(""))),
            "Please fill in all required fields"
        );
    }

    #[test]
    fn reset_requires_email() {
        assert!(validate_reset("a@example.com").is_ok());
        assert_eq!(message(validate_reset("")), "Please enter your email");
    }

    #[test]
    fn validation_errors_are_invalid_input() {
        let err = validate_reset("").unwrap_err();
        assert_eq!(err.error_code(), "invalid_input");
    }
}
