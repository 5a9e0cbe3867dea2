//! User account endpoints under `/api/users`

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::middleware::AdminPrivilege;
use crate::api::state::AppState;
use crate::api::types::{ApiError, ApiResponse, Json};
use crate::domain::{DomainError, DtoData, DtoIn, DtoOut, QueryField, User, UserInput, UserQuery};
use crate::infrastructure::user::USER_NOT_FOUND;

pub const USERNAME_MISSING: &str = "Invalid input: username not provided";
pub const USERNAME_TAKEN: &str = "Username is taken";
pub const EMAIL_TAKEN: &str = "Email is already in use";
pub const INVALID_ID: &str = "Invalid ID";
pub const ADMIN_FIELDS_FORBIDDEN: &str =
    "Only administrators may modify isAdmin, isActive, lastLogin or dateJoined";

type UserResponse = ApiResponse<DtoData<User>>;

/// Create the users router
///
/// Any method not routed here answers 405 with the failure envelope.
pub fn create_users_router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).fallback(method_not_allowed))
        .route("/api/users/create", post(create_user).fallback(method_not_allowed))
        .route(
            "/api/users/{id}",
            get(get_user)
                .patch(update_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        )
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Optional equality filter for listing
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub field: Option<String>,
    pub criteria: Option<String>,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersParams>,
) -> Result<UserResponse, ApiError> {
    debug!(field = ?params.field, criteria = ?params.criteria, "Listing users");

    let dto = DtoIn {
        data: UserInput::default(),
        field: params.field,
        criteria: params.criteria,
    };

    let out = state.user_service.get_many_users(dto).await?;

    Ok(ApiResponse::from_dto(out))
}

/// POST /api/users/create
///
/// Bookkeeping fields in the body are ignored; the store sets them.
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<UserInput>,
) -> Result<UserResponse, ApiError> {
    let Some(username) = input.username.clone().filter(|u| !u.is_empty()) else {
        return Err(ApiError::bad_request(USERNAME_MISSING));
    };

    let repository = state.user_service.repository();

    if repository
        .exists(&UserQuery::by_username(username.as_str()))
        .await
        .map_err(DomainError::from)?
    {
        info!(username = %username, "Rejected create: username taken");
        return Err(ApiError::conflict(USERNAME_TAKEN));
    }

    if let Some(email) = &input.email {
        if repository
            .exists(&UserQuery::by_email(email.as_str()))
            .await
            .map_err(DomainError::from)?
        {
            info!("Rejected create: email in use");
            return Err(ApiError::conflict(EMAIL_TAKEN));
        }
    }

    let user = User::new(input.without_bookkeeping()).map_err(DomainError::from)?;
    let out = state.user_service.create_user(DtoIn::new(user)).await?;

    Ok(ApiResponse::created(out.data))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<UserResponse, ApiError> {
    ensure_valid_id(&state, &id)?;

    let out = state.user_service.get_one_user(by_id(id)).await?;

    found(out)
}

/// PATCH /api/users/{id}
///
/// Only the fields present in the body change.
pub async fn update_user(
    State(state): State<AppState>,
    privilege: AdminPrivilege,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> Result<UserResponse, ApiError> {
    ensure_valid_id(&state, &id)?;

    let repository = state.user_service.repository();

    let Some(current) = repository
        .get_one(&UserQuery::new(QueryField::Id, id.as_str()))
        .await
        .map_err(DomainError::from)?
    else {
        return Err(ApiError::not_found(USER_NOT_FOUND));
    };

    let current_id = current.id().map(|id| id.as_str().to_string());

    if let Some(username) = &input.username {
        let query = UserQuery::by_username(username.as_str());
        ensure_not_held(&state, query, current_id.as_deref(), USERNAME_TAKEN).await?;
    }

    if let Some(email) = &input.email {
        let query = UserQuery::by_email(email.as_str());
        ensure_not_held(&state, query, current_id.as_deref(), EMAIL_TAKEN).await?;
    }

    if input.has_privileged_fields() && !privilege.is_admin() {
        info!(user_id = %id, "Rejected update of administrator fields");
        return Err(ApiError::forbidden(ADMIN_FIELDS_FORBIDDEN));
    }

    let user = User::new(UserInput {
        id: current_id.or(Some(id)),
        ..input
    })
    .map_err(DomainError::from)?;

    let out = state.user_service.update_user(DtoIn::new(user)).await?;

    found(out)
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<UserResponse, ApiError> {
    ensure_valid_id(&state, &id)?;

    let out = state.user_service.delete_user(by_id(id)).await?;

    found(out)
}

fn ensure_valid_id(state: &AppState, id: &str) -> Result<(), ApiError> {
    if state.id_scheme.is_valid(id) {
        Ok(())
    } else {
        debug!(id = %id, "Rejected malformed user id");
        Err(ApiError::bad_request(INVALID_ID))
    }
}

/// Fail with 409 when another user already holds the value
async fn ensure_not_held(
    state: &AppState,
    query: UserQuery,
    own_id: Option<&str>,
    message: &str,
) -> Result<(), ApiError> {
    let holder = state
        .user_service
        .repository()
        .get_one(&query)
        .await
        .map_err(DomainError::from)?;

    match holder.as_ref().and_then(User::id) {
        Some(holder_id) if Some(holder_id.as_str()) != own_id => {
            info!(field = %query.field, "Rejected update: value held by another user");
            Err(ApiError::conflict(message))
        }
        _ => Ok(()),
    }
}

fn by_id(id: String) -> DtoIn<UserInput> {
    DtoIn::new(UserInput {
        id: Some(id),
        ..Default::default()
    })
}

fn found(out: DtoOut<User>) -> Result<UserResponse, ApiError> {
    if out.as_message() == Some(USER_NOT_FOUND) {
        return Err(ApiError::not_found(USER_NOT_FOUND));
    }

    Ok(ApiResponse::from_dto(out))
}
