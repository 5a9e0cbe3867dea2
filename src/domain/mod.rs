//! Domain layer - Core business logic and entities

pub mod dto;
pub mod error;
pub mod user;

pub use dto::{DtoData, DtoIn, DtoOut};
pub use error::{DomainError, FieldErrors, RepositoryError};
pub use user::{
    IdScheme, QueryField, User, UserId, UserInput, UserQuery, UserRepository,
    UserValidationError, PAGE_SIZE,
};
