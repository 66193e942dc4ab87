//! Authentication and role-guard middleware for Axum
//!
//! `auth_middleware` verifies the bearer token and stores the caller as an
//! [`AuthenticatedUser`] request extension. `require_roles` runs after it on
//! each guarded route and rejects callers whose role is not in the route's
//! [`AllowedRoles`] list.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::domain::UserRole;
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims};
use crate::interfaces::http::common::ApiResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    InsufficientPermissions,
}

/// Authentication state containing the JWT config
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Caller identity derived from a verified token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// `None` when the token carries a role this service does not know.
    ///
    /// The role is the one issued at login; it is not re-read from the store,
    /// so a role change only takes effect once the token expires.
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        let role = claims.role()?;
        Some(Self {
            user_id: claims.sub,
            username: claims.username,
            role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Static allow-list of roles for one route
#[derive(Clone, Copy, Debug)]
pub struct AllowedRoles(pub &'static [UserRole]);

impl AllowedRoles {
    pub const USER: Self = Self(&[UserRole::User]);
    pub const ADMIN: Self = Self(&[UserRole::Admin]);
    pub const ANY: Self = Self(&[UserRole::User, UserRole::Admin]);

    pub fn permits(&self, role: UserRole) -> bool {
        self.0.contains(&role)
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT bearer authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    let claims = match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected token: {}", e);
            return match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    auth_error_response(AuthError::ExpiredToken)
                }
                _ => auth_error_response(AuthError::InvalidToken),
            };
        }
    };
    if claims.is_expired() {
        return auth_error_response(AuthError::ExpiredToken);
    }

    let Some(user) = AuthenticatedUser::from_claims(claims) else {
        return auth_error_response(AuthError::InvalidToken);
    };
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Role guard. Must run inside `auth_middleware`.
pub async fn require_roles(
    State(allowed): State<AllowedRoles>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>() else {
        return auth_error_response(AuthError::MissingToken);
    };

    if !allowed.permits(user.role) {
        warn!(
            user_id = %user.user_id,
            role = %user.role,
            path = %request.uri().path(),
            "Role not allowed for route"
        );
        return auth_error_response(AuthError::InsufficientPermissions);
    }

    next.run(request).await
}

fn auth_error_response(error: AuthError) -> Response {
    let (status, message) = match error {
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authentication token"),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid authentication token"),
        AuthError::ExpiredToken => (StatusCode::UNAUTHORIZED, "Token has expired"),
        AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Insufficient permissions"),
    };

    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::infrastructure::crypto::jwt::create_token;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "middleware-secret".into(),
            expiration_hours: 1,
            issuer: "bike-rental".into(),
        }
    }

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.username
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/admin",
                get(whoami).route_layer(middleware::from_fn_with_state(
                    AllowedRoles::ADMIN,
                    require_roles,
                )),
            )
            .route(
                "/any",
                get(whoami).route_layer(middleware::from_fn_with_state(
                    AllowedRoles::ANY,
                    require_roles,
                )),
            )
            .route_layer(middleware::from_fn_with_state(
                AuthState {
                    jwt_config: jwt_config(),
                },
                auth_middleware,
            ))
    }

    async fn call(path: &str, token: Option<&str>) -> StatusCode {
        let mut req = Request::builder().uri(path);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        app()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn extract_token_requires_bearer_scheme() {
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("Bearer "), None);
    }

    #[test]
    fn allowed_roles() {
        assert!(AllowedRoles::ANY.permits(UserRole::User));
        assert!(AllowedRoles::ANY.permits(UserRole::Admin));
        assert!(!AllowedRoles::ADMIN.permits(UserRole::User));
        assert!(!AllowedRoles::USER.permits(UserRole::Admin));
    }

    #[tokio::test]
    async fn missing_or_garbage_token_is_401() {
        assert_eq!(call("/any", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call("/any", Some("not-a-jwt")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_401() {
        let other = JwtConfig {
            secret: "other".into(),
            ..jwt_config()
        };
        let token = create_token("u1", "rider", UserRole::Admin, &other).unwrap();
        assert_eq!(call("/admin", Some(&token)).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn role_outside_allow_list_is_403() {
        let token = create_token("u1", "rider", UserRole::User, &jwt_config()).unwrap();
        assert_eq!(call("/admin", Some(&token)).await, StatusCode::FORBIDDEN);
        assert_eq!(call("/any", Some(&token)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_passes_admin_guard() {
        let token = create_token("a1", "boss", UserRole::Admin, &jwt_config()).unwrap();
        assert_eq!(call("/admin", Some(&token)).await, StatusCode::OK);
    }
}
