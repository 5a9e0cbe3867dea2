//! Infrastructure layer - storage adapters, hashing and logging

pub mod logging;
pub mod storage;
pub mod user;
