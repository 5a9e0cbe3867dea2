//! Field/criteria queries against the user store

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entity::UserId;
use crate::domain::DomainError;

/// Maximum number of users returned by a single `get_many`
pub const PAGE_SIZE: usize = 10;

/// User fields that can be matched by equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryField {
    Id,
    Username,
    Email,
    FirstName,
    LastName,
    TelegramLink,
    PreferredName,
}

impl QueryField {
    /// Name as it appears in JSON payloads and document stores
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Email => "email",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::TelegramLink => "telegramLink",
            Self::PreferredName => "preferredName",
        }
    }
}

impl FromStr for QueryField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" | "_id" => Ok(Self::Id),
            "username" => Ok(Self::Username),
            "email" => Ok(Self::Email),
            "firstName" => Ok(Self::FirstName),
            "lastName" => Ok(Self::LastName),
            "telegramLink" => Ok(Self::TelegramLink),
            "preferredName" => Ok(Self::PreferredName),
            other => Err(DomainError::invalid_input(format!(
                "Unsupported query field: '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Find by this field equal to this value"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub field: QueryField,
    pub criteria: String,
}

impl UserQuery {
    pub fn new(field: QueryField, criteria: impl Into<String>) -> Self {
        Self {
            field,
            criteria: criteria.into(),
        }
    }

    pub fn by_id(id: &UserId) -> Self {
        Self::new(QueryField::Id, id.as_str())
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self::new(QueryField::Username, username)
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self::new(QueryField::Email, email)
    }
}

impl fmt::Display for UserQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = '{}'", self.field, self.criteria)
    }
}

/// Identifier format a storage backend assigns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// Relational auto-increment key (decimal digits)
    Numeric,
    /// 24-character lowercase hexadecimal document id
    ObjectId,
    /// Hyphenated UUID
    Uuid,
}

impl IdScheme {
    /// Check whether `raw` is a syntactically valid id for this scheme
    pub fn is_valid(&self, raw: &str) -> bool {
        match self {
            Self::Numeric => !raw.is_empty() && raw.parse::<i64>().map(|n| n > 0).unwrap_or(false),
            Self::ObjectId => {
                raw.len() == 24 && raw.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            }
            Self::Uuid => uuid::Uuid::parse_str(raw)
                .map(|u| u.hyphenated().to_string() == raw.to_ascii_lowercase())
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_field_round_trips_names() {
        for field in [
            QueryField::Id,
            QueryField::Username,
            QueryField::Email,
            QueryField::FirstName,
            QueryField::LastName,
            QueryField::TelegramLink,
            QueryField::PreferredName,
        ] {
            assert_eq!(field.as_str().parse::<QueryField>().unwrap(), field);
        }
    }

    #[test]
    fn test_query_field_rejects_password() {
        assert!(matches!(
            "password".parse::<QueryField>(),
            Err(DomainError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_numeric_ids() {
        assert!(IdScheme::Numeric.is_valid("42"));
        assert!(IdScheme::Numeric.is_valid("9999999999"));
        assert!(!IdScheme::Numeric.is_valid("invalid_id"));
        assert!(!IdScheme::Numeric.is_valid("-3"));
        assert!(!IdScheme::Numeric.is_valid(""));
    }

    #[test]
    fn test_object_ids() {
        assert!(IdScheme::ObjectId.is_valid("65a1f0c2e4b0a1b2c3d4e5f6"));
        assert!(!IdScheme::ObjectId.is_valid("65a1f0c2e4b0a1b2c3d4e5f"));
        assert!(!IdScheme::ObjectId.is_valid("invalid_id"));
        assert!(!IdScheme::ObjectId.is_valid("65A1F0C2E4B0A1B2C3D4E5F6"));
    }

    #[test]
    fn test_uuid_ids() {
        assert!(IdScheme::Uuid.is_valid("7f9c24e8-3b12-4fef-91e0-2d3c9a1b5e60"));
        assert!(!IdScheme::Uuid.is_valid("7f9c24e83b124fef91e02d3c9a1b5e60"));
        assert!(!IdScheme::Uuid.is_valid("invalid_id"));
    }

    #[test]
    fn test_query_display() {
        let query = UserQuery::by_username("testUser");
        assert_eq!(query.to_string(), "username = 'testUser'");
    }
}
