//! Migrate command - prepares the storage backend

use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use crate::config::StorageBackend;
use crate::infrastructure::storage::{
    connect_mongo, connect_postgres, revert_last_user_migration, run_user_migrations,
};
use crate::infrastructure::user::{Argon2Hasher, MongoUserRepository};

#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {
    /// Revert the most recent migration instead (PostgreSQL only)
    #[arg(long)]
    pub revert: bool,
}

/// Run the migration for the configured backend
pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = connect_postgres(&config.storage.postgres.to_postgres_config()).await?;

            if args.revert {
                match revert_last_user_migration(&pool).await? {
                    Some(version) => info!(version, "Reverted migration"),
                    None => info!("No migration to revert"),
                }
            } else {
                run_user_migrations(&pool).await?;
                info!("Users table is up to date");
            }
        }
        StorageBackend::Mongodb => {
            if args.revert {
                warn!("MongoDB indexes are not reverted; drop them manually if needed");
                return Ok(());
            }

            let db = connect_mongo(&config.storage.mongo.to_mongo_config()).await?;
            let hasher = Arc::new(Argon2Hasher::with_cost(config.security.password_hash_cost));
            MongoUserRepository::new(&db, hasher).init_indexes().await?;
            info!(database = %config.storage.mongo.database, "User indexes created");
        }
        StorageBackend::Memory => {
            info!("In-memory storage needs no migration");
        }
    }

    Ok(())
}
