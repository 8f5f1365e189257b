//! Error types for GameScout

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, ScoutError>;

/// Known identity-provider codes and the messages shown to the user
const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("auth/user-not-found", "No user found with this email address."),
    ("auth/wrong-password", "Incorrect password."),
    ("auth/email-already-in-use", "An account with this email already exists."),
    ("auth/weak-password", "Password should be at least 6 characters."),
    ("auth/invalid-email", "Please enter a valid email address."),
    ("auth/user-disabled", "This account has been disabled."),
    ("auth/too-many-requests", "Too many failed attempts. Please try again later."),
    ("auth/network-request-failed", "Network error. Please check your connection."),
    ("auth/popup-closed-by-user", "Sign-in popup was closed before completion."),
    ("auth/popup-blocked", "Sign-in popup was blocked by the browser."),
];

const UNKNOWN_ERROR_CODE: &str = "unknown-error";
const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Look up the user-facing message for a provider code
pub fn auth_message(code: &str) -> Option<&'static str> {
    AUTH_MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

/// Raw failure as the identity provider reports it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Transport failure before the provider answered
    pub fn network(message: impl Into<String>) -> Self {
        Self::new("auth/network-request-failed", message)
    }
}

/// Identity failure ready to be shown to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        let code = if err.code.is_empty() {
            UNKNOWN_ERROR_CODE.to_string()
        } else {
            err.code
        };
        let message = match auth_message(&code) {
            Some(known) => known.to_string(),
            None if err.message.is_empty() => UNEXPECTED_ERROR_MESSAGE.to_string(),
            None => err.message,
        };
        Self { code, message }
    }
}

/// Document store failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No document to update: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Failures of account and profile operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to {action}: {source}")]
    Profile {
        action: &'static str,
        source: StoreError,
    },

    #[error("User not authenticated")]
    NotAuthenticated,
}

impl IdentityError {
    pub fn profile(action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| IdentityError::Profile { action, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code_uses_table_message() {
        let err = AuthError::from(ProviderError::new(
            "auth/email-already-in-use",
            "EMAIL_EXISTS",
        ));
        assert_eq!(err.code, "auth/email-already-in-use");
        assert_eq!(err.to_string(), "An account with this email already exists.");
    }

    #[test]
    fn test_unknown_code_passes_raw_message() {
        let err = AuthError::from(ProviderError::new("auth/quota-exceeded", "Quota exceeded"));
        assert_eq!(err.message, "Quota exceeded");

        let err = AuthError::from(ProviderError::new("", ""));
        assert_eq!(err.code, "unknown-error");
        assert_eq!(err.message, "An unexpected error occurred.");
    }

    #[test]
    fn test_profile_error_display() {
        let err = IdentityError::profile("add to favorites")(StoreError::Backend(
            "permission denied".to_string(),
        ));
        assert_eq!(err.to_string(), "Failed to add to favorites: permission denied");
        assert_eq!(IdentityError::NotAuthenticated.to_string(), "User not authenticated");
    }
}
