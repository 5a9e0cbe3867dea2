//! User infrastructure module
//!
//! This module provides the storage adapters behind `UserRepository`
//! (PostgreSQL, MongoDB and in-memory), password hashing with Argon2,
//! and the user service the HTTP layer drives.

mod mongo_repository;
mod password;
mod postgres_repository;
mod record;
mod repository;
mod service;

pub use mongo_repository::MongoUserRepository;
pub use password::{Argon2Hasher, PasswordHasher, DEFAULT_HASH_COST};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::{UserService, NO_USERS_FOUND, USER_DELETED, USER_NOT_FOUND};
