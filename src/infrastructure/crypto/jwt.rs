//! JWT Token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::UserRole;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token expiration time in hours
    pub expiration_hours: i64,
    /// Issuer claim
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "super-secret-key-change-in-production".to_string()),
            expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            issuer: "bike-rental".to_string(),
        }
    }
}

/// JWT TokenClaims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Username
    pub username: String,
    /// User role
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl TokenClaims {
    pub fn new(user_id: &str, username: &str, role: UserRole, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours);

        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Parsed role claim. `None` for tokens carrying a role this service does not know.
    pub fn role(&self) -> Option<UserRole> {
        self.role.parse().ok()
    }
}

/// Create a JWT token for a user
pub fn create_token(
    user_id: &str,
    username: &str,
    role: UserRole,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let token_claims = TokenClaims::new(user_id, username, role, config);

    encode(
        &Header::default(),
        &token_claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify and decode a JWT token
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            issuer: "bike-rental".to_string(),
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let config = test_config();
        let token = create_token("user-123", "rider", UserRole::Admin, &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.username, "rider");
        assert_eq!(claims.role(), Some(UserRole::Admin));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid-token", &test_config());
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token("user-123", "rider", UserRole::User, &test_config()).unwrap();
        let other = JwtConfig {
            secret: "another-secret".to_string(),
            ..test_config()
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let token = create_token("user-123", "rider", UserRole::User, &test_config()).unwrap();
        let other = JwtConfig {
            issuer: "someone-else".to_string(),
            ..test_config()
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_unknown_role_claim() {
        let mut claims = TokenClaims::new("u", "n", UserRole::User, &test_config());
        claims.role = "operator".into();
        assert_eq!(claims.role(), None);
    }
}
