//! Application state for shared services

use std::sync::Arc;

use crate::domain::{IdScheme, UserRepository};
use crate::infrastructure::user::UserService;

/// Application state shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub user_service: UserService,
    /// Id format of the active storage backend
    pub id_scheme: IdScheme,
    /// Value of `x-admin-token` granting administrator privileges
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(repository: Arc<dyn UserRepository>, id_scheme: IdScheme) -> Self {
        Self {
            user_service: UserService::new(repository),
            id_scheme,
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}
