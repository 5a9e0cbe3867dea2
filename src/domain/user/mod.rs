//! User domain
//!
//! This module provides domain types and traits for user accounts,
//! including the self-validating entity, field queries and the repository
//! contract storage backends implement.

mod entity;
mod query;
mod repository;
mod validation;

pub use entity::{User, UserId, UserInput};
pub use query::{IdScheme, QueryField, UserQuery, PAGE_SIZE};
pub use repository::UserRepository;
pub use validation::{
    validate_email, validate_first_name, validate_last_name, validate_password,
    validate_telegram_link, validate_username, UserValidationError,
};

#[cfg(test)]
pub use repository::MockUserRepository;
