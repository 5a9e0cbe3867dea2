//! Helpers shared by the storage adapters

use crate::domain::{RepositoryError, User, UserInput};

/// Reject a new user missing the fields every backend requires
pub(crate) fn require_credentials(user: &User) -> Result<(), RepositoryError> {
    if user.username().is_none() {
        return Err(RepositoryError::validation("username", "Username is required"));
    }

    if user.password().is_none() {
        return Err(RepositoryError::validation("password", "Password is required"));
    }

    Ok(())
}

/// Rebuild an entity from stored field values, dropping the password
pub(crate) fn to_entity(mut input: UserInput) -> Result<User, RepositoryError> {
    input.password = None;

    User::new(input).map_err(|e| RepositoryError::server(format!("Stored user is invalid: {}", e)))
}
