//! PostgreSQL user repository implementation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use super::password::PasswordHasher;
use super::record::{require_credentials, to_entity};
use crate::domain::user::{QueryField, User, UserInput, UserQuery, UserRepository, PAGE_SIZE};
use crate::domain::RepositoryError;

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, telegram_link, \
                            preferred_name, is_admin, is_active, last_login, date_joined";

/// PostgreSQL implementation of UserRepository
///
/// Ids are `BIGSERIAL` keys rendered as decimal strings.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
    hasher: Arc<dyn PasswordHasher>,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { pool, hasher }
    }
}

/// Equality filter translated to a column comparison
#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Id(i64),
    Column(&'static str, String),
}

impl Filter {
    /// `None` when the criteria cannot match any row (e.g. a non-numeric id)
    fn from_query(query: &UserQuery) -> Option<Self> {
        match query.field {
            QueryField::Id => query.criteria.parse().ok().map(Self::Id),
            field => Some(Self::Column(column(field), query.criteria.clone())),
        }
    }

    fn condition(&self) -> String {
        match self {
            Self::Id(_) => "id = $1".to_string(),
            Self::Column(name, _) => format!("{} = $1", name),
        }
    }

    fn bind<'q>(&'q self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            Self::Id(id) => query.bind(*id),
            Self::Column(_, value) => query.bind(value.as_str()),
        }
    }
}

fn column(field: QueryField) -> &'static str {
    match field {
        QueryField::Id => "id",
        QueryField::Username => "username",
        QueryField::Email => "email",
        QueryField::FirstName => "first_name",
        QueryField::LastName => "last_name",
        QueryField::TelegramLink => "telegram_link",
        QueryField::PreferredName => "preferred_name",
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn exists(&self, query: &UserQuery) -> Result<bool, RepositoryError> {
        let Some(filter) = Filter::from_query(query) else {
            return Ok(false);
        };

        let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {})", filter.condition());

        let row = filter
            .bind(sqlx::query(&sql))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to check user: {}", e)))?;

        row.try_get(0).map_err(read_error)
    }

    async fn get_one(&self, query: &UserQuery) -> Result<Option<User>, RepositoryError> {
        let Some(filter) = Filter::from_query(query) else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY id LIMIT 1",
            USER_COLUMNS,
            filter.condition()
        );

        let row = filter
            .bind(sqlx::query(&sql))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_many(&self, query: Option<UserQuery>) -> Result<Vec<User>, RepositoryError> {
        let rows = match query {
            Some(query) => {
                let Some(filter) = Filter::from_query(&query) else {
                    return Ok(Vec::new());
                };

                let sql = format!(
                    "SELECT {} FROM users WHERE {} ORDER BY id LIMIT {}",
                    USER_COLUMNS,
                    filter.condition(),
                    PAGE_SIZE
                );

                filter.bind(sqlx::query(&sql)).fetch_all(&self.pool).await
            }
            None => {
                let sql = format!("SELECT {} FROM users ORDER BY id LIMIT {}", USER_COLUMNS, PAGE_SIZE);

                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| RepositoryError::server(format!("Failed to list users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        require_credentials(&user)?;

        let hashed = user.password().map(|p| self.hasher.hash(p)).transpose()?;

        let sql = format!(
            r#"
            INSERT INTO users (username, password, first_name, last_name, email,
                               telegram_link, preferred_name, is_admin, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(user.username())
            .bind(hashed)
            .bind(user.first_name())
            .bind(user.last_name())
            .bind(user.email())
            .bind(user.telegram_link())
            .bind(user.preferred_name())
            .bind(user.is_admin())
            .bind(user.is_active())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "create user"))?;

        row_to_user(&row)
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let Some(id) = user.id().and_then(|id| id.as_str().parse::<i64>().ok()) else {
            return Ok(None);
        };

        let hashed = user.password().map(|p| self.hasher.hash(p)).transpose()?;

        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                password = COALESCE($3, password),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                email = COALESCE($6, email),
                telegram_link = COALESCE($7, telegram_link),
                preferred_name = COALESCE($8, preferred_name),
                is_admin = COALESCE($9, is_admin),
                is_active = COALESCE($10, is_active),
                last_login = COALESCE($11, last_login),
                date_joined = COALESCE($12, date_joined)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user.username())
            .bind(hashed)
            .bind(user.first_name())
            .bind(user.last_name())
            .bind(user.email())
            .bind(user.telegram_link())
            .bind(user.preferred_name())
            .bind(user.admin_flag())
            .bind(user.active_flag())
            .bind(user.last_login())
            .bind(user.date_joined())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "update user"))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete(&self, query: &UserQuery) -> Result<bool, RepositoryError> {
        let Some(filter) = Filter::from_query(query) else {
            return Ok(false);
        };

        // deletes at most one row, matching get_one
        let sql = format!(
            "DELETE FROM users WHERE id = (SELECT id FROM users WHERE {} ORDER BY id LIMIT 1)",
            filter.condition()
        );

        let result = filter
            .bind(sqlx::query(&sql))
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

fn read_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::server(format!("Failed to read user row: {}", e))
}

/// Map insert/update failures, naming the field behind a unique violation
fn write_error(e: sqlx::Error, action: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            return RepositoryError::duplicate(constraint_field(constraint));
        }
    }

    RepositoryError::server(format!("Failed to {}: {}", action, e))
}

fn constraint_field(constraint: &str) -> &'static str {
    if constraint.contains("email") {
        "email"
    } else {
        "username"
    }
}

fn row_to_user(row: &PgRow) -> Result<User, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(read_error)?;
    let last_login: Option<DateTime<Utc>> = row.try_get("last_login").map_err(read_error)?;
    let date_joined: Option<DateTime<Utc>> = row.try_get("date_joined").map_err(read_error)?;

    to_entity(UserInput {
        id: Some(id.to_string()),
        username: row.try_get("username").map_err(read_error)?,
        password: None,
        first_name: row.try_get("first_name").map_err(read_error)?,
        last_name: row.try_get("last_name").map_err(read_error)?,
        last_login,
        date_joined,
        is_admin: row.try_get("is_admin").map_err(read_error)?,
        is_active: row.try_get("is_active").map_err(read_error)?,
        telegram_link: row.try_get("telegram_link").map_err(read_error)?,
        email: row.try_get("email").map_err(read_error)?,
        preferred_name: row.try_get("preferred_name").map_err(read_error)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_maps_columns() {
        let filter = Filter::from_query(&UserQuery::new(QueryField::TelegramLink, "https://t.me/jd")).unwrap();

        assert_eq!(filter.condition(), "telegram_link = $1");
        assert_eq!(filter, Filter::Column("telegram_link", "https://t.me/jd".to_string()));
    }

    #[test]
    fn test_filter_numeric_id() {
        let filter = Filter::from_query(&UserQuery::new(QueryField::Id, "42")).unwrap();

        assert_eq!(filter, Filter::Id(42));
        assert_eq!(filter.condition(), "id = $1");
    }

    #[test]
    fn test_filter_rejects_non_numeric_id() {
        assert!(Filter::from_query(&UserQuery::new(QueryField::Id, "invalid_id")).is_none());
        assert!(Filter::from_query(&UserQuery::new(QueryField::Id, "65a1f0c2e4b0a1b2c3d4e5f6")).is_none());
    }

    #[test]
    fn test_constraint_field() {
        assert_eq!(constraint_field("users_email_key"), "email");
        assert_eq!(constraint_field("users_username_key"), "username");
    }

    #[test]
    fn test_non_database_error_is_server_error() {
        let err = write_error(sqlx::Error::RowNotFound, "create user");
        assert!(err.is_server_error());
    }
}
