//! MongoDB user repository implementation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::password::PasswordHasher;
use super::record::{require_credentials, to_entity};
use crate::domain::user::{QueryField, User, UserInput, UserQuery, UserRepository, PAGE_SIZE};
use crate::domain::RepositoryError;

const COLLECTION: &str = "users";
const DUPLICATE_KEY: i32 = 11000;
const USERNAME_INDEX: &str = "idx_username_unique";
const EMAIL_INDEX: &str = "idx_email_unique";

/// Stored shape of a user in the `users` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    username: String,
    password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    // absent rather than null so the sparse unique index ignores it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    telegram_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferred_name: Option<String>,
    #[serde(default)]
    is_admin: bool,
    #[serde(default = "default_active")]
    is_active: bool,
    last_login: bson::DateTime,
    date_joined: bson::DateTime,
}

fn default_active() -> bool {
    true
}

impl UserDocument {
    fn into_entity(self) -> Result<User, RepositoryError> {
        to_entity(UserInput {
            id: self.id.map(|id| id.to_hex()),
            username: Some(self.username),
            password: None,
            first_name: self.first_name,
            last_name: self.last_name,
            last_login: from_bson_datetime(self.last_login),
            date_joined: from_bson_datetime(self.date_joined),
            is_admin: Some(self.is_admin),
            is_active: Some(self.is_active),
            telegram_link: self.telegram_link,
            email: self.email,
            preferred_name: self.preferred_name,
        })
    }
}

fn to_bson_datetime(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

fn from_bson_datetime(value: bson::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis())
}

/// MongoDB implementation of UserRepository
///
/// Ids are `ObjectId`s rendered as 24-character hex strings.
#[derive(Debug, Clone)]
pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
    hasher: Arc<dyn PasswordHasher>,
}

impl MongoUserRepository {
    pub fn new(db: &Database, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            collection: db.collection::<UserDocument>(COLLECTION),
            hasher,
        }
    }

    /// Create the unique indexes uniqueness checks rely on
    pub async fn init_indexes(&self) -> Result<(), RepositoryError> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(USERNAME_INDEX.to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name(EMAIL_INDEX.to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection
            .create_indexes(indexes)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to create user indexes: {}", e)))?;

        info!("User indexes created successfully");
        Ok(())
    }
}

/// Build the equality filter for a query
///
/// `None` when the criteria cannot match any document (e.g. a malformed ObjectId).
fn filter_for(query: &UserQuery) -> Option<Document> {
    match query.field {
        QueryField::Id => ObjectId::parse_str(&query.criteria)
            .ok()
            .map(|id| doc! { "_id": id }),
        field => {
            let mut filter = Document::new();
            filter.insert(field.as_str(), query.criteria.as_str());
            Some(filter)
        }
    }
}

/// `$set` document holding the present fields of `user`
fn update_document(user: &User, hashed_password: Option<String>) -> Document {
    let mut set = Document::new();

    let strings = [
        ("username", user.username()),
        ("firstName", user.first_name()),
        ("lastName", user.last_name()),
        ("email", user.email()),
        ("telegramLink", user.telegram_link()),
        ("preferredName", user.preferred_name()),
    ];

    for (key, value) in strings {
        if let Some(value) = value {
            set.insert(key, value);
        }
    }

    if let Some(password) = hashed_password {
        set.insert("password", password);
    }

    if let Some(is_admin) = user.admin_flag() {
        set.insert("isAdmin", is_admin);
    }

    if let Some(is_active) = user.active_flag() {
        set.insert("isActive", is_active);
    }

    if let Some(last_login) = user.last_login() {
        set.insert("lastLogin", to_bson_datetime(last_login));
    }

    if let Some(date_joined) = user.date_joined() {
        set.insert("dateJoined", to_bson_datetime(date_joined));
    }

    set
}

/// Message of a duplicate key failure, if `e` is one
fn duplicate_key_message(e: &mongodb::error::Error) -> Option<&str> {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY => {
            Some(&write_error.message)
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY => {
            Some(&command_error.message)
        }
        _ => None,
    }
}

/// Map insert/update failures, naming the field behind a duplicate key
fn write_error(e: mongodb::error::Error, action: &str) -> RepositoryError {
    match duplicate_key_message(&e) {
        Some(message) => RepositoryError::duplicate(duplicate_field(message)),
        None => RepositoryError::server(format!("Failed to {}: {}", action, e)),
    }
}

/// Field guarded by the index named in an E11000 message
///
/// The message also echoes the duplicate value, so only the index name
/// (or the key pattern when no name is present) is inspected.
fn duplicate_field(message: &str) -> &'static str {
    let index = message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next());

    match index {
        Some(EMAIL_INDEX) => "email",
        Some(_) => "username",
        None if message.contains("dup key: { email:") => "email",
        None => "username",
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self))]
    async fn exists(&self, query: &UserQuery) -> Result<bool, RepositoryError> {
        let Some(filter) = filter_for(query) else {
            return Ok(false);
        };

        let count = self
            .collection
            .count_documents(filter)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to check user: {}", e)))?;

        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn get_one(&self, query: &UserQuery) -> Result<Option<User>, RepositoryError> {
        let Some(filter) = filter_for(query) else {
            return Ok(None);
        };

        let document = self
            .collection
            .find_one(filter)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to get user: {}", e)))?;

        document.map(UserDocument::into_entity).transpose()
    }

    #[instrument(skip(self))]
    async fn get_many(&self, query: Option<UserQuery>) -> Result<Vec<User>, RepositoryError> {
        let filter = match query.as_ref() {
            Some(query) => match filter_for(query) {
                Some(filter) => filter,
                None => return Ok(Vec::new()),
            },
            None => doc! {},
        };

        let options = FindOptions::builder().limit(PAGE_SIZE as i64).build();

        let documents: Vec<UserDocument> = self
            .collection
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to list users: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to read users: {}", e)))?;

        documents.into_iter().map(UserDocument::into_entity).collect()
    }

    #[instrument(skip(self, user))]
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        require_credentials(&user)?;

        let password = self.hasher.hash(user.password().unwrap_or_default())?;

        let now = to_bson_datetime(Utc::now());

        let mut document = UserDocument {
            id: None,
            username: user.username().unwrap_or_default().to_string(),
            password,
            first_name: user.first_name().map(str::to_string),
            last_name: user.last_name().map(str::to_string),
            email: user.email().map(str::to_string),
            telegram_link: user.telegram_link().map(str::to_string),
            preferred_name: user.preferred_name().map(str::to_string),
            is_admin: user.is_admin(),
            is_active: user.is_active(),
            last_login: now,
            date_joined: now,
        };

        let result = self
            .collection
            .insert_one(&document)
            .await
            .map_err(|e| write_error(e, "create user"))?;

        document.id = result.inserted_id.as_object_id();

        info!(user_id = ?document.id, "User created");
        document.into_entity()
    }

    #[instrument(skip(self, user))]
    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let Some(id) = user.id().and_then(|id| ObjectId::parse_str(id.as_str()).ok()) else {
            return Ok(None);
        };

        let hashed = user.password().map(|p| self.hasher.hash(p)).transpose()?;
        let set = update_document(&user, hashed);

        if set.is_empty() {
            return self.get_one(&UserQuery::new(QueryField::Id, id.to_hex())).await;
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let document = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .with_options(options)
            .await
            .map_err(|e| write_error(e, "update user"))?;

        document.map(UserDocument::into_entity).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, query: &UserQuery) -> Result<bool, RepositoryError> {
        let Some(filter) = filter_for(query) else {
            return Ok(false);
        };

        let result = self
            .collection
            .delete_one(filter)
            .await
            .map_err(|e| RepositoryError::server(format!("Failed to delete user: {}", e)))?;

        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> UserDocument {
        let now = bson::DateTime::from_millis(1_700_000_000_000);

        UserDocument {
            id: Some(ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap()),
            username: "testUser".to_string(),
            password: "$argon2id$v=19$m=19456,t=3,p=1$c2FsdA$aGFzaA".to_string(),
            first_name: Some("John".to_string()),
            last_name: None,
            email: None,
            telegram_link: None,
            preferred_name: Some("testUser".to_string()),
            is_admin: false,
            is_active: true,
            last_login: now,
            date_joined: now,
        }
    }

    #[test]
    fn test_filter_for_object_id() {
        let filter = filter_for(&UserQuery::new(QueryField::Id, "65a1f0c2e4b0a1b2c3d4e5f6")).unwrap();
        assert!(filter.get_object_id("_id").is_ok());

        assert!(filter_for(&UserQuery::new(QueryField::Id, "invalid_id")).is_none());
        assert!(filter_for(&UserQuery::new(QueryField::Id, "42")).is_none());
    }

    #[test]
    fn test_filter_for_camel_case_field() {
        let filter = filter_for(&UserQuery::new(QueryField::FirstName, "John")).unwrap();
        assert_eq!(filter, doc! { "firstName": "John" });
    }

    #[test]
    fn test_document_into_entity() {
        let user = sample_document().into_entity().unwrap();

        assert_eq!(user.id().map(|id| id.as_str()), Some("65a1f0c2e4b0a1b2c3d4e5f6"));
        assert_eq!(user.username(), Some("testUser"));
        assert!(user.password().is_none());
        assert_eq!(
            user.date_joined().map(|d| d.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn test_document_omits_absent_email() {
        let document = bson::to_document(&sample_document()).unwrap();

        assert!(!document.contains_key("email"));
        assert!(document.contains_key("_id"));
        assert!(document.contains_key("preferredName"));
    }

    #[test]
    fn test_update_document_only_present_fields() {
        let user = User::new(UserInput {
            id: Some("65a1f0c2e4b0a1b2c3d4e5f6".to_string()),
            username: Some("newName".to_string()),
            is_admin: Some(true),
            ..Default::default()
        })
        .unwrap();

        let set = update_document(&user, None);

        assert_eq!(set.get_str("username").unwrap(), "newName");
        assert_eq!(set.get_str("preferredName").unwrap(), "newName");
        assert!(set.get_bool("isAdmin").unwrap());
        assert!(!set.contains_key("email"));
        assert!(!set.contains_key("password"));
        assert!(!set.contains_key("isActive"));
    }

    #[test]
    fn test_duplicate_field_reads_index_name() {
        let username = "E11000 duplicate key error collection: user_accounts.users \
                        index: idx_username_unique dup key: { username: \"emailUser\" }";
        let email = "E11000 duplicate key error collection: user_accounts.users \
                     index: idx_email_unique dup key: { email: \"username@example.com\" }";

        assert_eq!(duplicate_field(username), "username");
        assert_eq!(duplicate_field(email), "email");
    }

    #[test]
    fn test_duplicate_field_without_index_name() {
        assert_eq!(duplicate_field("E11000 dup key: { email: \"a@b.co\" }"), "email");
        assert_eq!(duplicate_field("E11000 dup key: { username: \"email\" }"), "username");
    }

    #[test]
    fn test_non_duplicate_write_is_server_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");

        let err = write_error(mongodb::error::Error::from(io), "create user");

        assert!(err.is_server_error());
    }

    #[test]
    fn test_update_document_empty_patch() {
        let user = User::new(UserInput {
            id: Some("65a1f0c2e4b0a1b2c3d4e5f6".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(update_document(&user, None).is_empty());
    }
}
