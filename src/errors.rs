//! Typed error hierarchy for the floortrack client.
//!
//! - `ApiError` is what every service call returns. Its display strings are
//!   the messages shown to the operator; transport and server details only
//!   go to the log.
//! - `StorageError` covers the local session file and preference store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use validator::ValidationErrors;

/// Field name → messages, in a stable order for display.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    #[error("Not authorized. Please sign in again.")]
    Unauthorized,

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("An unexpected error occurred. Please try again.")]
    Unexpected,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Single-field validation error.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        Self::Validation(fields)
    }

    /// Errors after which the local session is gone.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::SessionExpired)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(field_errors(&errors))
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode stored value: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Flatten validator output into field → messages. Nested struct and list
/// errors are reported under their top-level field.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|err| {
                err.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", err.code))
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    for field in errors.errors().keys() {
        fields
            .entry(field.to_string())
            .or_insert_with(|| vec!["Invalid value".to_string()]);
    }
    fields
}

fn summarize(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use floortrack_common::CustomerDraft;
    use validator::Validate;

    #[test]
    fn api_error_messages_are_user_facing() {
        assert_eq!(ApiError::RateLimited.to_string(), RATE_LIMITED_MESSAGE);
        assert_eq!(ApiError::Unexpected.to_string(), UNEXPECTED_MESSAGE);
        assert_eq!(ApiError::InvalidCredentials.to_string(), "Invalid credentials");
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = ApiError::invalid("name", "Name is required");
        match &err {
            ApiError::Validation(fields) => {
                assert_eq!(fields["name"], vec!["Name is required".to_string()]);
            }
            _ => panic!("Expected Validation variant"),
        }
        assert_eq!(err.to_string(), "Validation failed: name: Name is required");
    }

    #[test]
    fn validator_errors_convert_to_field_errors() {
        let draft = CustomerDraft {
            name: "Acme".to_string(),
            email: "nope".to_string(),
            phone: "5551234567".to_string(),
            address: String::new(),
        };
        let err: ApiError = draft.validate().unwrap_err().into();
        match err {
            ApiError::Validation(fields) => {
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("address"));
                assert!(!fields.contains_key("name"));
                assert_eq!(fields["email"], vec!["Invalid email address".to_string()]);
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn storage_error_converts_into_api_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = StorageError::Write {
            path: PathBuf::from("/data/session"),
            source: io_err,
        }
        .into();
        assert!(matches!(err, ApiError::Storage(StorageError::Write { .. })));
        assert!(err.to_string().contains("/data/session"));
    }

    #[test]
    fn sign_in_required_only_for_auth_failures() {
        assert!(ApiError::Unauthorized.requires_sign_in());
        assert!(ApiError::SessionExpired.requires_sign_in());
        assert!(!ApiError::RateLimited.requires_sign_in());
    }
}
