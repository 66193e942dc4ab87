//! User API handlers
//!
//! `/users/me*` act on the caller; everything else is admin-only CRUD.
//! Delegates to `UserService` from the application/identity layer.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    ChangePasswordRequest, CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, UserDto,
};
use crate::application::UserService;
use crate::domain::{CreateUserDto, UpdateUserDto};
use crate::interfaces::http::common::{ok, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService>,
}

fn user_not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("User '{}' not found", id))
}

// ── Self-service ────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own profile", body = ApiResponse<UserDto>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_me(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<UserDto> {
    let user = state
        .user_service
        .find_by_id(&caller.user_id)
        .await?
        .ok_or_else(|| user_not_found(&caller.user_id))?;
    ok(user.into())
}

#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserDto>),
        (status = 409, description = "Username or email taken"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_me(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<UserDto> {
    let user = state
        .user_service
        .update_user_data(&caller.user_id, UpdateUserDto::from(request))
        .await?
        .ok_or_else(|| user_not_found(&caller.user_id))?;
    ok(user.into())
}

#[utoipa::path(
    put,
    path = "/users/me/password",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Invalid current password"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn change_my_password(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .user_service
        .change_password(
            &caller.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await?;
    ok(())
}

// ── Admin ───────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserDto>),
        (status = 400, description = "Unknown role"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let role = request.role()?;
    let user = state
        .user_service
        .create(CreateUserDto {
            username: request.username,
            email: request.email,
            role,
            password: request.password,
        })
        .await?
        .ok_or_else(|| ApiError::conflict("User with given email already exists"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<UserDto> {
    let user = state
        .user_service
        .find_by_id(&id)
        .await?
        .ok_or_else(|| user_not_found(&id))?;
    ok(user.into())
}

#[utoipa::path(
    get,
    path = "/users/by-email/{email}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("email" = String, Path, description = "Email address")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user_by_email(
    State(state): State<UserHandlerState>,
    Path(email): Path<String>,
) -> ApiResult<UserDto> {
    let user = state
        .user_service
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User with email '{}' not found", email)))?;
    ok(user.into())
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserDto> {
    let dto = UpdateUserDto::try_from(request)?;
    let user = state
        .user_service
        .update_user_data(&id, dto)
        .await?
        .ok_or_else(|| user_not_found(&id))?;
    ok(user.into())
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted user", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<UserDto> {
    let user = state
        .user_service
        .delete_user(&id)
        .await?
        .ok_or_else(|| user_not_found(&id))?;
    ok(user.into())
}
