//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::validation::{
    validate_email, validate_first_name, validate_last_name, validate_password,
    validate_telegram_link, validate_username, UserValidationError,
};

/// Opaque user identifier assigned by the storage backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId; the value only has to be non-empty
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyId);
        }

        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial field set a user is constructed from
///
/// Request bodies and storage rows both arrive in this shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub telegram_link: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_name: Option<String>,
}

impl UserInput {
    /// Whether any field reserved for administrators is present
    pub fn has_privileged_fields(&self) -> bool {
        self.is_admin.is_some()
            || self.is_active.is_some()
            || self.last_login.is_some()
            || self.date_joined.is_some()
    }

    /// Drop bookkeeping fields the store owns on creation
    pub fn without_bookkeeping(mut self) -> Self {
        self.is_admin = None;
        self.is_active = None;
        self.last_login = None;
        self.date_joined = None;
        self
    }

    /// Overlay the present fields of `patch` on top of `self`
    ///
    /// The id is never taken from the patch.
    pub fn patched_with(self, patch: UserInput) -> Self {
        Self {
            id: self.id,
            username: patch.username.or(self.username),
            password: patch.password.or(self.password),
            first_name: patch.first_name.or(self.first_name),
            last_name: patch.last_name.or(self.last_name),
            last_login: patch.last_login.or(self.last_login),
            date_joined: patch.date_joined.or(self.date_joined),
            is_admin: patch.is_admin.or(self.is_admin),
            is_active: patch.is_active.or(self.is_active),
            telegram_link: patch.telegram_link.or(self.telegram_link),
            email: patch.email.or(self.email),
            preferred_name: patch.preferred_name.or(self.preferred_name),
        }
    }
}

/// Validated user entity
///
/// A `User` only exists in a fully valid state: every present field has
/// passed its rule. Absent fields stay `None` and flags fall back to their
/// defaults when read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: Option<UserId>,
    username: Option<String>,
    /// Plain or hashed password - never exposed in serialization
    #[serde(skip_serializing)]
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    last_login: Option<DateTime<Utc>>,
    date_joined: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_admin_flag")]
    is_admin: Option<bool>,
    #[serde(serialize_with = "serialize_active_flag")]
    is_active: Option<bool>,
    telegram_link: Option<String>,
    email: Option<String>,
    preferred_name: Option<String>,
}

impl User {
    /// Construct a user, validating each present field in order
    ///
    /// Fails on the first invalid field. Supplying a username also sets the
    /// preferred name to the same value.
    pub fn new(input: UserInput) -> Result<Self, UserValidationError> {
        let id = input.id.map(UserId::new).transpose()?;
        let mut preferred_name = input.preferred_name;

        if let Some(username) = &input.username {
            validate_username(username)?;
            preferred_name = Some(username.clone());
        }

        if let Some(password) = &input.password {
            validate_password(password)?;
        }

        if let Some(first_name) = &input.first_name {
            validate_first_name(first_name)?;
        }

        if let Some(last_name) = &input.last_name {
            validate_last_name(last_name)?;
        }

        if let Some(link) = &input.telegram_link {
            validate_telegram_link(link)?;
        }

        if let Some(email) = &input.email {
            validate_email(email)?;
        }

        Ok(Self {
            id,
            username: input.username,
            password: input.password,
            first_name: input.first_name,
            last_name: input.last_name,
            last_login: input.last_login,
            date_joined: input.date_joined,
            is_admin: input.is_admin,
            is_active: input.is_active,
            telegram_link: input.telegram_link,
            email: input.email,
            preferred_name,
        })
    }

    // Getters

    pub fn id(&self) -> Option<&UserId> {
        self.id.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    pub fn date_joined(&self) -> Option<DateTime<Utc>> {
        self.date_joined
    }

    pub fn telegram_link(&self) -> Option<&str> {
        self.telegram_link.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn preferred_name(&self) -> Option<&str> {
        self.preferred_name.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    /// Admin flag as supplied, `None` when the caller left it out
    pub fn admin_flag(&self) -> Option<bool> {
        self.is_admin
    }

    /// Active flag as supplied, `None` when the caller left it out
    pub fn active_flag(&self) -> Option<bool> {
        self.is_active
    }

    /// Same user with the password removed
    pub fn without_password(mut self) -> Self {
        self.password = None;
        self
    }

    /// Decompose back into raw field values
    pub fn into_input(self) -> UserInput {
        UserInput {
            id: self.id.map(String::from),
            username: self.username,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            last_login: self.last_login,
            date_joined: self.date_joined,
            is_admin: self.is_admin,
            is_active: self.is_active,
            telegram_link: self.telegram_link,
            email: self.email,
            preferred_name: self.preferred_name,
        }
    }
}

fn serialize_admin_flag<S: Serializer>(value: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bool(value.unwrap_or(false))
}

fn serialize_active_flag<S: Serializer>(value: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bool(value.unwrap_or(true))
}
