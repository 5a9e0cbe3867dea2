//! Versioned schema migrations for the relational user store

use sqlx::postgres::PgPool;

use crate::domain::RepositoryError;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version BIGINT PRIMARY KEY,
        description TEXT NOT NULL,
        installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// Applies and reverts migrations, recording versions in `_migrations`
///
/// Each migration and its bookkeeping row change in one transaction.
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_migrations_table(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, RepositoryError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to check migration {}: {}", version, e)))
    }

    /// Apply `migration` unless it is already recorded
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), RepositoryError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| migration_error("begin", migration, e))?;

        sqlx::query(&migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error("apply", migration, e))?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error("record", migration, e))?;

        tx.commit().await.map_err(|e| migration_error("commit", migration, e))?;

        tracing::info!(version = migration.version, description = %migration.description, "Migration applied");
        Ok(())
    }

    /// Revert `migration` if it is recorded
    pub async fn revert_migration(&self, migration: &Migration) -> Result<(), RepositoryError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| migration_error("begin", migration, e))?;

        sqlx::query(&migration.down)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error("revert", migration, e))?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error("unrecord", migration, e))?;

        tx.commit().await.map_err(|e| migration_error("commit", migration, e))?;

        tracing::info!(version = migration.version, "Migration reverted");
        Ok(())
    }

    /// Latest recorded version, if any
    pub async fn current_version(&self) -> Result<Option<i64>, RepositoryError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to read migration version: {}", e)))
    }
}

fn migration_error(step: &str, migration: &Migration, e: sqlx::Error) -> RepositoryError {
    RepositoryError::server(format!(
        "Migration {} failed to {}: {}",
        migration.version, step, e
    ))
}

/// A reversible schema change
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    pub up: String,
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Schema migrations for the user store
pub fn user_migrations() -> Vec<Migration> {
    vec![Migration::new(
        1,
        "Create users table",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL,
            password TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            telegram_link TEXT,
            preferred_name TEXT,
            is_admin BOOLEAN NOT NULL DEFAULT FALSE,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            last_login TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT users_username_key UNIQUE (username),
            CONSTRAINT users_email_key UNIQUE (email)
        );
        "#,
        r#"
        DROP TABLE IF EXISTS users;
        "#,
    )]
}

/// Runs all pending user store migrations
pub async fn run_user_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    let migrator = PostgresMigrator::new(pool.clone());

    for migration in user_migrations() {
        migrator.run_migration(&migration).await?;
    }

    Ok(())
}

/// Reverts the most recently applied user store migration
///
/// Returns the reverted version, or `None` when nothing was applied.
pub async fn revert_last_user_migration(pool: &PgPool) -> Result<Option<i64>, RepositoryError> {
    let migrator = PostgresMigrator::new(pool.clone());

    let Some(version) = migrator.current_version().await? else {
        return Ok(None);
    };

    match user_migrations().into_iter().find(|m| m.version == version) {
        Some(migration) => {
            migrator.revert_migration(&migration).await?;
            Ok(Some(version))
        }
        None => Err(RepositoryError::server(format!(
            "Unknown migration version {}",
            version
        ))),
    }
}
