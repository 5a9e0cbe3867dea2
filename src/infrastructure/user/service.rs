//! User service - one use case per repository operation

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::user::{QueryField, User, UserInput, UserQuery, UserRepository};
use crate::domain::{DomainError, DtoIn, DtoOut};

pub const USER_NOT_FOUND: &str = "User not found";
pub const NO_USERS_FOUND: &str = "No users found";
pub const USER_DELETED: &str = "User deleted successfully";

/// User service orchestrating the repository
///
/// Absence is reported as a literal message in the output envelope; failures
/// are logged and returned unchanged.
#[derive(Debug, Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repository
    }

    /// Get a single user
    ///
    /// The query comes from `field`/`criteria`, falling back to the id and
    /// then the username carried in `data`.
    pub async fn get_one_user(&self, dto: DtoIn<UserInput>) -> Result<DtoOut<User>, DomainError> {
        let query = lookup_query(&dto)?;

        let user = self
            .repository
            .get_one(&query)
            .await
            .map_err(|e| log_failure("get user", e.into()))?;

        Ok(match user {
            Some(user) => DtoOut::entity(user),
            None => DtoOut::message(USER_NOT_FOUND),
        })
    }

    /// Get up to one page of users, optionally filtered by `field`/`criteria`
    pub async fn get_many_users(&self, dto: DtoIn<UserInput>) -> Result<DtoOut<User>, DomainError> {
        let query = dto.query().map_err(|e| log_failure("list users", e))?;

        let users = self
            .repository
            .get_many(query)
            .await
            .map_err(|e| log_failure("list users", e.into()))?;

        if users.is_empty() {
            return Ok(DtoOut::message(NO_USERS_FOUND));
        }

        Ok(DtoOut::collection(users))
    }

    /// Persist a new user
    pub async fn create_user(&self, dto: DtoIn<User>) -> Result<DtoOut<User>, DomainError> {
        let user = self
            .repository
            .create(dto.data)
            .await
            .map_err(|e| log_failure("create user", e.into()))?;

        info!(user_id = ?user.id().map(|id| id.as_str()), "User created");
        Ok(DtoOut::entity(user))
    }

    /// Apply the present fields of a user to the stored record with its id
    pub async fn update_user(&self, dto: DtoIn<User>) -> Result<DtoOut<User>, DomainError> {
        let user = self
            .repository
            .update(dto.data)
            .await
            .map_err(|e| log_failure("update user", e.into()))?;

        Ok(match user {
            Some(user) => DtoOut::entity(user),
            None => DtoOut::message(USER_NOT_FOUND),
        })
    }

    /// Delete a single user, addressed the same way as `get_one_user`
    pub async fn delete_user(&self, dto: DtoIn<UserInput>) -> Result<DtoOut<User>, DomainError> {
        let query = lookup_query(&dto)?;

        let deleted = self
            .repository
            .delete(&query)
            .await
            .map_err(|e| log_failure("delete user", e.into()))?;

        if deleted {
            info!(query = %query, "User deleted");
            Ok(DtoOut::message(USER_DELETED))
        } else {
            Ok(DtoOut::message(USER_NOT_FOUND))
        }
    }
}

fn lookup_query(dto: &DtoIn<UserInput>) -> Result<UserQuery, DomainError> {
    if let Some(query) = dto.query().map_err(|e| log_failure("resolve query", e))? {
        return Ok(query);
    }

    if let Some(id) = &dto.data.id {
        return Ok(UserQuery::new(QueryField::Id, id.clone()));
    }

    if let Some(username) = &dto.data.username {
        return Ok(UserQuery::by_username(username.clone()));
    }

    Err(log_failure(
        "resolve query",
        DomainError::invalid_input("an id, a username or a field and criteria is required"),
    ))
}

fn log_failure(operation: &str, e: DomainError) -> DomainError {
    match &e {
        DomainError::Repository(repo_err) if repo_err.is_server_error() => {
            error!(error = %e, operation, "User operation failed");
        }
        _ => {
            info!(error = %e, operation, "User operation rejected");
        }
    }

    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::MockUserRepository;
    use crate::domain::{DtoData, RepositoryError};
    use crate::infrastructure::user::password::Argon2Hasher;
    use crate::infrastructure::user::repository::InMemoryUserRepository;

    fn create_service() -> UserService {
        let hasher = Arc::new(Argon2Hasher::with_cost(1));
        UserService::new(Arc::new(InMemoryUserRepository::with_hasher(hasher)))
    }

    fn new_user(username: &str, email: Option<&str>) -> User {
        User::new(UserInput {
            username: Some(username.to_string()),
            password: Some("secret@##".to_string()),
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            email: email.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    fn by_id(id: &str) -> DtoIn<UserInput> {
        DtoIn::new(UserInput {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }

    fn created_entity(out: DtoOut<User>) -> User {
        match out.data {
            DtoData::Entity(user) => user,
            other => panic!("expected entity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_user_hides_password() {
        let service = create_service();

        let out = service
            .create_user(DtoIn::new(new_user("testUser", None)))
            .await
            .unwrap();

        let user = created_entity(out.clone());
        assert!(user.id().is_some());
        assert!(user.password().is_none());

        let json = serde_json::to_value(&out).unwrap();
        assert!(json["data"].get("password").is_none());
        assert_eq!(json["data"]["username"], "testUser");
    }

    #[tokio::test]
    async fn test_create_duplicate_username() {
        let service = create_service();
        service
            .create_user(DtoIn::new(new_user("testUser", None)))
            .await
            .unwrap();

        let err = service
            .create_user(DtoIn::new(new_user("testUser", None)))
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::Repository(RepositoryError::duplicate("username")));
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let service = create_service();
        service
            .create_user(DtoIn::new(new_user("firstUser", Some("jd@gmail.com"))))
            .await
            .unwrap();

        let err = service
            .create_user(DtoIn::new(new_user("secondUser", Some("jd@gmail.com"))))
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::Repository(RepositoryError::duplicate("email")));
    }

    #[tokio::test]
    async fn test_get_one_user_by_id_and_username() {
        let service = create_service();
        let created = created_entity(
            service
                .create_user(DtoIn::new(new_user("testUser", None)))
                .await
                .unwrap(),
        );
        let id = created.id().unwrap().to_string();

        let by_id = created_entity(service.get_one_user(by_id(&id)).await.unwrap());
        assert_eq!(by_id.username(), Some("testUser"));
        assert!(by_id.password().is_none());

        let by_name = service
            .get_one_user(DtoIn::new(UserInput::default()).with_query("username", "testUser"))
            .await
            .unwrap();
        assert_eq!(created_entity(by_name).id(), created.id());
    }

    #[tokio::test]
    async fn test_get_one_user_not_found() {
        let service = create_service();

        let out = service
            .get_one_user(by_id(&uuid::Uuid::new_v4().to_string()))
            .await
            .unwrap();
        assert_eq!(out.as_message(), Some(USER_NOT_FOUND));

        let out = service
            .get_one_user(DtoIn::new(UserInput {
                username: Some("nobody".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(out.as_message(), Some(USER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_get_one_user_without_query() {
        let service = create_service();

        let err = service
            .get_one_user(DtoIn::new(UserInput::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_get_many_users() {
        let service = create_service();

        let out = service.get_many_users(DtoIn::default()).await.unwrap();
        assert_eq!(out.as_message(), Some(NO_USERS_FOUND));

        service
            .create_user(DtoIn::new(new_user("firstUser", None)))
            .await
            .unwrap();
        service
            .create_user(DtoIn::new(new_user("secondUser", None)))
            .await
            .unwrap();

        let out = service.get_many_users(DtoIn::default()).await.unwrap();
        match out.data {
            DtoData::Collection(users) => {
                assert_eq!(users.len(), 2);
                assert!(users.iter().all(|u| u.password().is_none()));
            }
            other => panic!("expected collection, got {:?}", other),
        }

        let filtered = service
            .get_many_users(DtoIn::default().with_query("username", "secondUser"))
            .await
            .unwrap();
        assert!(matches!(filtered.data, DtoData::Collection(ref users) if users.len() == 1));
    }

    #[tokio::test]
    async fn test_update_user() {
        let service = create_service();
        let created = created_entity(
            service
                .create_user(DtoIn::new(new_user("testUser", None)))
                .await
                .unwrap(),
        );

        let patch = User::new(UserInput {
            id: Some(created.id().unwrap().to_string()),
            last_name: Some("Smith".to_string()),
            ..Default::default()
        })
        .unwrap();

        let updated = created_entity(service.update_user(DtoIn::new(patch)).await.unwrap());
        assert_eq!(updated.last_name(), Some("Smith"));
        assert_eq!(updated.first_name(), Some("John"));
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        let service = create_service();
        let patch = User::new(UserInput {
            id: Some(uuid::Uuid::new_v4().to_string()),
            last_name: Some("Smith".to_string()),
            ..Default::default()
        })
        .unwrap();

        let out = service.update_user(DtoIn::new(patch)).await.unwrap();
        assert_eq!(out.as_message(), Some(USER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = create_service();
        let created = created_entity(
            service
                .create_user(DtoIn::new(new_user("testUser", None)))
                .await
                .unwrap(),
        );
        let id = created.id().unwrap().to_string();

        let out = service.delete_user(by_id(&id)).await.unwrap();
        assert_eq!(out.as_message(), Some(USER_DELETED));

        let out = service.delete_user(by_id(&id)).await.unwrap();
        assert_eq!(out.as_message(), Some(USER_NOT_FOUND));

        let out = service.get_one_user(by_id(&id)).await.unwrap();
        assert_eq!(out.as_message(), Some(USER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_server_error_is_returned_unchanged() {
        let mut mock = MockUserRepository::new();
        mock.expect_get_one()
            .times(1)
            .returning(|_| Err(RepositoryError::server("connection refused")));

        let service = UserService::new(Arc::new(mock));

        let err = service.get_one_user(by_id("1")).await.unwrap_err();
        assert_eq!(err, DomainError::server("connection refused"));
    }

    #[tokio::test]
    async fn test_get_many_calls_repository_once_with_filter() {
        let mut mock = MockUserRepository::new();
        mock.expect_get_many()
            .withf(|query| query.as_ref() == Some(&UserQuery::by_email("jd@gmail.com")))
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let service = UserService::new(Arc::new(mock));

        let out = service
            .get_many_users(DtoIn::default().with_query("email", "jd@gmail.com"))
            .await
            .unwrap();
        assert_eq!(out.as_message(), Some(NO_USERS_FOUND));
    }

    #[tokio::test]
    async fn test_invalid_query_field_skips_repository() {
        let mut mock = MockUserRepository::new();
        mock.expect_get_many().never();

        let service = UserService::new(Arc::new(mock));

        let err = service
            .get_many_users(DtoIn::default().with_query("password", "secret@##"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_conflict_on_update_is_returned_unchanged() {
        let mut mock = MockUserRepository::new();
        mock.expect_update()
            .times(1)
            .returning(|_| Err(RepositoryError::duplicate("username")));

        let service = UserService::new(Arc::new(mock));
        let patch = User::new(UserInput {
            id: Some("1".to_string()),
            username: Some("takenName".to_string()),
            ..Default::default()
        })
        .unwrap();

        let err = service.update_user(DtoIn::new(patch)).await.unwrap_err();
        assert_eq!(err, DomainError::Repository(RepositoryError::duplicate("username")));
    }
}
