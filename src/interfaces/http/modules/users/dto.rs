//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::domain::{UpdateUserDto, User, UserRole};
use crate::interfaces::http::common::ApiError;

/// User API representation. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    /// `user` or `admin`
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.as_str().to_string(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Usernames must not look like an email address, login accepts either.
pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.contains('@') {
        let mut err = ValidationError::new("username_at_sign");
        err.message = Some("username must not contain '@'".into());
        return Err(err);
    }
    Ok(())
}

fn parse_role(role: Option<&str>) -> Result<Option<UserRole>, ApiError> {
    role.map(|r| r.parse::<UserRole>())
        .transpose()
        .map_err(ApiError::from)
}

/// Admin-side user creation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 50, message = "username must be 3-50 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "password must be 6-128 characters"))]
    pub password: String,
    /// Defaults to `user`
    pub role: Option<String>,
}

impl CreateUserRequest {
    pub fn role(&self) -> Result<Option<UserRole>, ApiError> {
        parse_role(self.role.as_deref())
    }
}

/// Admin-side partial update
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 3, max = 50, message = "username must be 3-50 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    pub role: Option<String>,
}

impl TryFrom<UpdateUserRequest> for UpdateUserDto {
    type Error = ApiError;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            role: parse_role(req.role.as_deref())?,
            username: req.username,
            email: req.email,
        })
    }
}

/// Self-service profile update. The role cannot be changed here.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 3, max = 50, message = "username must be 3-50 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
}

impl From<UpdateProfileRequest> for UpdateUserDto {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            role: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128, message = "new password must be 6-128 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_parses_role() {
        let dto = UpdateUserDto::try_from(UpdateUserRequest {
            username: None,
            email: None,
            role: Some("Admin".into()),
        })
        .unwrap();
        assert_eq!(dto.role, Some(UserRole::Admin));

        let err = UpdateUserDto::try_from(UpdateUserRequest {
            username: None,
            email: None,
            role: Some("superuser".into()),
        })
        .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn user_dto_hides_password_hash() {
        let now = Utc::now();
        let json = serde_json::to_value(UserDto::from(User {
            id: "u1".into(),
            username: "rider".into(),
            email: "rider@test.com".into(),
            password_hash: "$2b$hash".into(),
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        }))
        .unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn usernames_with_at_sign_are_rejected() {
        let request = CreateUserRequest {
            username: "bob@x.com".into(),
            email: "other@x.com".into(),
            password: "secret1".into(),
            role: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));

        let profile = UpdateProfileRequest {
            username: Some("me@home".into()),
            email: None,
        };
        assert!(profile.validate().is_err());

        let profile = UpdateProfileRequest {
            username: Some("plain_name".into()),
            email: None,
        };
        assert!(profile.validate().is_ok());
    }
}
