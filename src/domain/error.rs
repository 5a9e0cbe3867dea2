use std::collections::BTreeMap;

use thiserror::Error;

use super::user::UserValidationError;

/// Per-field failure reasons reported by a storage backend
pub type FieldErrors = BTreeMap<String, String>;

/// Errors raised by repository adapters
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// Backend-side field constraint rejected the payload
    #[error("Validation failed: {}", format_fields(.fields))]
    Validation { fields: FieldErrors },

    /// Unique constraint violated (username or email already taken)
    #[error("Conflict: {}", format_fields(.fields))]
    Conflict { fields: FieldErrors },

    /// Failure not attributable to caller input (connectivity, driver errors)
    #[error("Server error: {message}")]
    Server { message: String },
}

impl RepositoryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), message.into());
        Self::Validation { fields }
    }

    pub fn duplicate(field: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), "Duplicate value".to_string());
        Self::Conflict { fields }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Field map for the validation-shaped variants
    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { fields } | Self::Conflict { fields } => Some(fields),
            Self::Server { .. } => None,
        }
    }
}

fn format_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Core domain errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DomainError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Repository(RepositoryError::server(message))
    }
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        Self::invalid_input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let error = DomainError::invalid_input("Invalid email provided");
        assert_eq!(error.to_string(), "Invalid input: Invalid email provided");
    }

    #[test]
    fn test_validation_error_keeps_message() {
        let error: DomainError = UserValidationError::InvalidEmail.into();
        assert_eq!(
            error,
            DomainError::InvalidInput {
                message: "Invalid email provided".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_names_field() {
        let error = RepositoryError::duplicate("username");
        assert_eq!(
            error.fields().and_then(|f| f.get("username")).map(String::as_str),
            Some("Duplicate value")
        );
        assert_eq!(error.to_string(), "Conflict: username: Duplicate value");
    }

    #[test]
    fn test_server_error_has_no_fields() {
        let error = RepositoryError::server("connection refused");
        assert!(error.is_server_error());
        assert!(error.fields().is_none());
    }

    #[test]
    fn test_repository_error_converts_unchanged() {
        let repo_err = RepositoryError::validation("password", "Password is required");
        let domain_err: DomainError = repo_err.clone().into();
        assert_eq!(domain_err, DomainError::Repository(repo_err));
    }
}
