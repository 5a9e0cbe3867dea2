//! Uniform envelopes passed between the HTTP, use-case and storage layers

use serde::Serialize;

use super::user::{QueryField, UserQuery};
use super::DomainError;

/// Input envelope: a payload plus an optional `field = criteria` query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DtoIn<T> {
    pub data: T,
    pub field: Option<String>,
    pub criteria: Option<String>,
}

impl<T> DtoIn<T> {
    /// Wrap a payload without a query
    pub fn new(data: T) -> Self {
        Self {
            data,
            field: None,
            criteria: None,
        }
    }

    /// Attach a `field = criteria` query
    pub fn with_query(mut self, field: impl Into<String>, criteria: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self.criteria = Some(criteria.into());
        self
    }

    /// Parse the attached query, if any
    ///
    /// A field without criteria (or the reverse) is rejected as invalid input.
    pub fn query(&self) -> Result<Option<UserQuery>, DomainError> {
        match (&self.field, &self.criteria) {
            (None, None) => Ok(None),
            (Some(field), Some(criteria)) => {
                let field: QueryField = field.parse()?;
                Ok(Some(UserQuery::new(field, criteria.clone())))
            }
            _ => Err(DomainError::invalid_input(
                "Query requires both a field and a criteria",
            )),
        }
    }
}

/// Result carried by an output envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DtoData<T> {
    Entity(T),
    Collection(Vec<T>),
    /// Literal message, e.g. "User not found"
    Message(String),
}

/// Output envelope returned by every use case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DtoOut<T> {
    pub data: DtoData<T>,
}

impl<T> DtoOut<T> {
    pub fn entity(value: T) -> Self {
        Self {
            data: DtoData::Entity(value),
        }
    }

    pub fn collection(values: Vec<T>) -> Self {
        Self {
            data: DtoData::Collection(values),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: DtoData::Message(message.into()),
        }
    }

    /// The literal message, when the outcome is one
    pub fn as_message(&self) -> Option<&str> {
        match &self.data {
            DtoData::Message(message) => Some(message),
            _ => None,
        }
    }
}
