//! Storage infrastructure - database connections and schema setup

pub mod migrations;
mod mongo;
mod postgres;

pub use migrations::{revert_last_user_migration, run_user_migrations, Migration, PostgresMigrator};
pub use mongo::{connect_mongo, MongoConfig};
pub use postgres::{connect_postgres, PostgresConfig};
