//! In-memory user repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::password::{Argon2Hasher, PasswordHasher};
use super::record::{require_credentials, to_entity};
use crate::domain::user::{QueryField, User, UserInput, UserQuery, UserRepository, PAGE_SIZE};
use crate::domain::RepositoryError;

/// In-memory implementation of UserRepository
///
/// Records are kept in insertion order with ids generated as UUID v4.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<UserInput>>>,
    hasher: Arc<dyn PasswordHasher>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::with_hasher(Arc::new(Argon2Hasher::new()))
    }

    /// Create an empty repository hashing passwords with `hasher`
    pub fn with_hasher(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users: Arc::new(RwLock::new(Vec::new())),
            hasher,
        }
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn field_value(record: &UserInput, field: QueryField) -> Option<&str> {
    match field {
        QueryField::Id => record.id.as_deref(),
        QueryField::Username => record.username.as_deref(),
        QueryField::Email => record.email.as_deref(),
        QueryField::FirstName => record.first_name.as_deref(),
        QueryField::LastName => record.last_name.as_deref(),
        QueryField::TelegramLink => record.telegram_link.as_deref(),
        QueryField::PreferredName => record.preferred_name.as_deref(),
    }
}

fn matches(record: &UserInput, query: &UserQuery) -> bool {
    field_value(record, query.field) == Some(query.criteria.as_str())
}

/// Find a unique field of `candidate` already held by a record other than `own_id`
fn find_duplicate(records: &[UserInput], candidate: &User, own_id: Option<&str>) -> Option<&'static str> {
    let others = || records.iter().filter(move |r| r.id.as_deref() != own_id);

    if let Some(username) = candidate.username() {
        if others().any(|r| r.username.as_deref() == Some(username)) {
            return Some("username");
        }
    }

    if let Some(email) = candidate.email() {
        if others().any(|r| r.email.as_deref() == Some(email)) {
            return Some("email");
        }
    }

    None
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn exists(&self, query: &UserQuery) -> Result<bool, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|r| matches(r, query)))
    }

    async fn get_one(&self, query: &UserQuery) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;

        users
            .iter()
            .find(|r| matches(r, query))
            .cloned()
            .map(to_entity)
            .transpose()
    }

    async fn get_many(&self, query: Option<UserQuery>) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;

        users
            .iter()
            .filter(|r| query.as_ref().is_none_or(|q| matches(r, q)))
            .take(PAGE_SIZE)
            .cloned()
            .map(to_entity)
            .collect()
    }

    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        require_credentials(&user)?;

        let hashed = user.password().map(|p| self.hasher.hash(p)).transpose()?;
        let mut users = self.users.write().await;

        if let Some(field) = find_duplicate(&users, &user, None) {
            return Err(RepositoryError::duplicate(field));
        }

        let now = Utc::now();
        let mut record = user.into_input();
        record.id = Some(uuid::Uuid::new_v4().to_string());
        record.password = hashed;
        record.date_joined = Some(now);
        record.last_login = Some(now);
        record.is_admin = Some(record.is_admin.unwrap_or(false));
        record.is_active = Some(record.is_active.unwrap_or(true));

        users.push(record.clone());

        to_entity(record)
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let Some(id) = user.id().map(|id| id.as_str().to_string()) else {
            return Ok(None);
        };

        let hashed = user.password().map(|p| self.hasher.hash(p)).transpose()?;
        let mut users = self.users.write().await;

        if let Some(field) = find_duplicate(&users, &user, Some(&id)) {
            return Err(RepositoryError::duplicate(field));
        }

        let Some(slot) = users.iter_mut().find(|r| r.id.as_deref() == Some(id.as_str())) else {
            return Ok(None);
        };

        let mut patch = user.into_input();
        patch.password = hashed;

        let updated = slot.clone().patched_with(patch);
        *slot = updated.clone();

        to_entity(updated).map(Some)
    }

    async fn delete(&self, query: &UserQuery) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;

        match users.iter().position(|r| matches(r, query)) {
            Some(index) => {
                users.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn repo() -> InMemoryUserRepository {
        InMemoryUserRepository::with_hasher(Arc::new(Argon2Hasher::with_cost(1)))
    }

    fn new_user(username: &str, email: Option<&str>) -> User {
        User::new(UserInput {
            username: Some(username.to_string()),
            password: Some("secret@##".to_string()),
            email: email.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let repo = repo();

        let created = repo.create(new_user("testUser", None)).await.unwrap();

        let id = created.id().unwrap();
        assert!(crate::domain::IdScheme::Uuid.is_valid(id.as_str()));
        assert!(created.date_joined().is_some());
        assert_eq!(created.date_joined(), created.last_login());
        assert!(created.password().is_none());
        assert!(!created.is_admin());
        assert!(created.is_active());
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let hasher = Arc::new(Argon2Hasher::with_cost(1));
        let repo = InMemoryUserRepository::with_hasher(hasher.clone());

        repo.create(new_user("testUser", None)).await.unwrap();

        let users = repo.users.read().await;
        let stored = users[0].password.as_deref().unwrap();
        assert_ne!(stored, "secret@##");
        assert!(hasher.verify("secret@##", stored));
    }

    #[tokio::test]
    async fn test_updated_password_is_stored_hashed() {
        let hasher = Arc::new(Argon2Hasher::with_cost(1));
        let repo = InMemoryUserRepository::with_hasher(hasher.clone());
        let created = repo.create(new_user("testUser", None)).await.unwrap();

        let patch = User::new(UserInput {
            id: Some(created.id().unwrap().to_string()),
            password: Some("changed@pass".to_string()),
            ..Default::default()
        })
        .unwrap();

        let updated = repo.update(patch).await.unwrap().unwrap();
        assert!(updated.password().is_none());

        let users = repo.users.read().await;
        let stored = users[0].password.as_deref().unwrap();
        assert_ne!(stored, "changed@pass");
        assert!(hasher.verify("changed@pass", stored));
        assert!(!hasher.verify("secret@##", stored));
    }

    #[tokio::test]
    async fn test_create_requires_credentials() {
        let repo = repo();
        let user = User::new(UserInput {
            username: Some("testUser".to_string()),
            ..Default::default()
        })
        .unwrap();

        let err = repo.create(user).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Validation { .. }));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let repo = repo();
        repo.create(new_user("testUser", Some("jd@gmail.com"))).await.unwrap();

        let err = repo.create(new_user("testUser", None)).await.unwrap_err();
        assert_eq!(err, RepositoryError::duplicate("username"));

        let err = repo
            .create(new_user("otherUser", Some("jd@gmail.com")))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::duplicate("email"));

        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_one_and_exists() {
        let repo = repo();
        let created = repo.create(new_user("testUser", None)).await.unwrap();

        let by_id = UserQuery::by_id(created.id().unwrap());
        assert!(repo.exists(&by_id).await.unwrap());

        let found = repo.get_one(&UserQuery::by_username("testUser")).await.unwrap().unwrap();
        assert_eq!(found.id(), created.id());
        assert!(found.password().is_none());

        let missing = UserQuery::by_username("nobody");
        assert!(!repo.exists(&missing).await.unwrap());
        assert!(repo.get_one(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_limits_and_filters() {
        let repo = repo();
        for i in 0..12 {
            repo.create(new_user(&format!("user_{}", i), None)).await.unwrap();
        }

        let all = repo.get_many(None).await.unwrap();
        assert_eq!(all.len(), PAGE_SIZE);
        assert_eq!(all[0].username(), Some("user_0"));
        assert!(all.iter().all(|u| u.password().is_none()));

        let filtered = repo
            .get_many(Some(UserQuery::by_username("user_11")))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        let none = repo
            .get_many(Some(UserQuery::by_username("nobody")))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_present_fields() {
        let repo = repo();
        let created = repo.create(new_user("testUser", Some("jd@gmail.com"))).await.unwrap();

        let patch = User::new(UserInput {
            id: Some(created.id().unwrap().to_string()),
            first_name: Some("Jane".to_string()),
            ..Default::default()
        })
        .unwrap();

        let updated = repo.update(patch).await.unwrap().unwrap();

        assert_eq!(updated.first_name(), Some("Jane"));
        assert_eq!(updated.username(), Some("testUser"));
        assert_eq!(updated.email(), Some("jd@gmail.com"));
        assert_eq!(updated.date_joined(), created.date_joined());
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_target_unchanged() {
        let repo = repo();
        repo.create(new_user("takenName", None)).await.unwrap();
        let target = repo.create(new_user("testUser", None)).await.unwrap();

        let patch = User::new(UserInput {
            id: Some(target.id().unwrap().to_string()),
            username: Some("takenName".to_string()),
            ..Default::default()
        })
        .unwrap();

        let err = repo.update(patch).await.unwrap_err();
        assert_eq!(err, RepositoryError::duplicate("username"));

        let unchanged = repo.get_one(&UserQuery::by_id(target.id().unwrap())).await.unwrap().unwrap();
        assert_eq!(unchanged.username(), Some("testUser"));
    }

    #[tokio::test]
    async fn test_update_keeping_own_username() {
        let repo = repo();
        let created = repo.create(new_user("testUser", None)).await.unwrap();

        let patch = User::new(UserInput {
            id: Some(created.id().unwrap().to_string()),
            username: Some("testUser".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(repo.update(patch).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let repo = repo();
        let patch = User::new(UserInput {
            id: Some(uuid::Uuid::new_v4().to_string()),
            first_name: Some("Jane".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(repo.update(patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo();
        let created = repo.create(new_user("testUser", None)).await.unwrap();
        let id: &UserId = created.id().unwrap();

        assert!(repo.delete(&UserQuery::by_id(id)).await.unwrap());
        assert!(!repo.delete(&UserQuery::by_id(id)).await.unwrap());
        assert!(repo.get_one(&UserQuery::by_id(id)).await.unwrap().is_none());
    }
}
