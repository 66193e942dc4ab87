//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::dto::{LoginRequest, LoginResponse, SignupRequest};
use crate::application::UserService;
use crate::interfaces::http::common::{ok, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::modules::users::UserDto;

#[derive(Clone)]
pub struct AuthHandlerState {
    pub user_service: Arc<UserService>,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let auth = state
        .user_service
        .login(&request.username, &request.password)
        .await?;

    ok(LoginResponse {
        token: auth.token,
        token_type: auth.token_type,
        expires_in: auth.expires_in,
        user: UserDto::from(auth.user),
    })
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserDto>),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn signup(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let user = state
        .user_service
        .signup(&request.username, &request.email, &request.password)
        .await?
        .ok_or_else(|| ApiError::conflict("User with given email already exists"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}
