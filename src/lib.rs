//! User Accounts API
//!
//! A REST service managing user accounts with:
//! - Field validation on a single entity type
//! - Pluggable storage (MongoDB, PostgreSQL, in-memory)
//! - Argon2 password hashing inside the storage adapters

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::StorageBackend;
use domain::{IdScheme, UserRepository};
use infrastructure::storage::{connect_mongo, connect_postgres, run_user_migrations};
use infrastructure::user::{
    Argon2Hasher, InMemoryUserRepository, MongoUserRepository, PasswordHasher,
    PostgresUserRepository,
};
use tracing::info;

/// Create the application state with custom configuration
///
/// Connects the configured backend and prepares its schema or indexes.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let hasher: Arc<dyn PasswordHasher> =
        Arc::new(Argon2Hasher::with_cost(config.security.password_hash_cost));

    info!(backend = ?config.storage.backend, "Storage backend selected");

    let (repository, id_scheme): (Arc<dyn UserRepository>, IdScheme) = match config.storage.backend {
        StorageBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let pool = connect_postgres(&config.storage.postgres.to_postgres_config()).await?;
            run_user_migrations(&pool).await?;
            info!("PostgreSQL connection established");

            (
                Arc::new(PostgresUserRepository::new(pool, hasher)),
                IdScheme::Numeric,
            )
        }
        StorageBackend::Mongodb => {
            info!("Connecting to MongoDB...");
            let db = connect_mongo(&config.storage.mongo.to_mongo_config()).await?;
            let repository = MongoUserRepository::new(&db, hasher);
            repository.init_indexes().await?;
            info!(database = %config.storage.mongo.database, "MongoDB connection established");

            (Arc::new(repository), IdScheme::ObjectId)
        }
        StorageBackend::Memory => (
            Arc::new(InMemoryUserRepository::with_hasher(hasher)),
            IdScheme::Uuid,
        ),
    };

    let mut state = AppState::new(repository, id_scheme);

    if let Some(token) = config.security.admin_token.as_deref() {
        state = state.with_admin_token(token);
    } else {
        info!("No admin token configured; administrator fields are read-only");
    }

    Ok(state)
}
