//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::entity::User;
use super::query::UserQuery;
use crate::domain::RepositoryError;

/// Storage contract every user backend implements
///
/// Entities returned from any operation never carry a password.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Check whether a user matching the query exists
    async fn exists(&self, query: &UserQuery) -> Result<bool, RepositoryError>;

    /// Get the first user matching the query
    async fn get_one(&self, query: &UserQuery) -> Result<Option<User>, RepositoryError>;

    /// Get up to `PAGE_SIZE` users in storage order, optionally filtered
    async fn get_many(&self, query: Option<UserQuery>) -> Result<Vec<User>, RepositoryError>;

    /// Persist a new user; the store assigns id and timestamps
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    /// Apply the present fields of `user` to the record with its id
    ///
    /// Returns `None` when no record has that id.
    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError>;

    /// Delete the user matching the query, returning whether one was removed
    async fn delete(&self, query: &UserQuery) -> Result<bool, RepositoryError>;
}
