//! API middleware components

pub mod admin_auth;
pub mod logging;

pub use admin_auth::{AdminPrivilege, ADMIN_TOKEN_HEADER};
pub use logging::logging_middleware;
