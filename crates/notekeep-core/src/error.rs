//! Error types for notekeep-core

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type alias using notekeep-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Field name to messages, as reported by the API on HTTP 400.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors that can occur in notekeep-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP 400 with field-scoped messages
    #[error("Validation failed: {}", render_field_errors(.0))]
    Validation(FieldErrors),

    /// Missing, expired, or rejected credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP 409: the submitted note version is stale
    #[error("Note was updated elsewhere. Reload the note before saving.")]
    Conflict,

    /// Network failure, timeout, or server-side error worth retrying
    #[error("Temporary failure: {0}")]
    Transient(String),

    /// Payload did not have the expected shape
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    /// Any other client error status (404, 405, ...)
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Token storage backend failure
    #[error("Secure storage error: {0}")]
    SecureStorage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a validation error for a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::Validation(errors)
    }

    /// Whether the failure may succeed when the same request is repeated.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Field messages for validation failures.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() {
            Self::InvalidConfiguration(error.to_string())
        } else if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else {
            // connect, timeout, body and redirect failures
            Self::Transient(error.to_string())
        }
    }
}

fn render_field_errors(errors: &FieldErrors) -> String {
    if errors.is_empty() {
        return "no details provided".to_string();
    }
    errors
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.insert("email".to_string(), vec!["Email already exists".to_string()]);
        errors.insert(
            "password".to_string(),
            vec!["Too short.".to_string(), "Too common.".to_string()],
        );
        let rendered = Error::Validation(errors).to_string();
        assert_eq!(
            rendered,
            "Validation failed: email: Email already exists; password: Too short. Too common."
        );
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(Error::Transient("503".to_string()).is_transient());
        assert!(!Error::Conflict.is_transient());
        assert!(!Error::Auth("expired".to_string()).is_transient());
        assert!(!Error::MalformedResponse("missing id".to_string()).is_transient());
        assert!(!Error::field("name", "blank").is_transient());
    }
}
