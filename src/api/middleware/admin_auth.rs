//! Administrator privilege extractor
//!
//! Callers presenting the configured token in `x-admin-token` are treated as
//! administrators. Without a configured token nobody is.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::api::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Whether the caller holds administrator privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminPrivilege(pub bool);

impl AdminPrivilege {
    pub fn is_admin(&self) -> bool {
        self.0
    }
}

fn token_matches(presented: Option<&str>, configured: Option<&str>) -> bool {
    match (presented, configured) {
        (Some(presented), Some(configured)) => !configured.is_empty() && presented == configured,
        _ => false,
    }
}

impl FromRequestParts<AppState> for AdminPrivilege {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        let is_admin = token_matches(presented, state.admin_token.as_deref());

        if presented.is_some() && !is_admin {
            debug!("Ignoring invalid admin token");
        }

        Ok(AdminPrivilege(is_admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches(Some("s3cret"), Some("s3cret")));
        assert!(!token_matches(Some("wrong"), Some("s3cret")));
        assert!(!token_matches(None, Some("s3cret")));
    }

    #[test]
    fn test_no_configured_token_grants_nothing() {
        assert!(!token_matches(Some("anything"), None));
        assert!(!token_matches(Some(""), Some("")));
    }
}
