//! User management service: application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    CreateUserDto, DomainError, DomainResult, NewUser, RepositoryProvider, UpdateUserDto, User,
    UserRepositoryInterface, UserRole,
};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password_with_cost, verify_password};

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// User service: orchestrates all identity / user-management use-cases.
pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
    jwt_config: JwtConfig,
    password_hash_cost: u32,
}

impl UserService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        jwt_config: JwtConfig,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            repos,
            jwt_config,
            password_hash_cost,
        }
    }

    fn users(&self) -> &dyn UserRepositoryInterface {
        self.repos.users()
    }

    fn hash(&self, password: &str) -> DomainResult<String> {
        hash_password_with_cost(password, self.password_hash_cost)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate user by username/email + password and return a JWT.
    pub async fn login(&self, username_or_email: &str, password: &str) -> DomainResult<AuthResult> {
        // An identifier with `@` is an email first, so a look-alike username
        // cannot shadow the account that owns the address.
        let users = self.users();
        let user = if username_or_email.contains('@') {
            match users.get_user_by_email(username_or_email).await? {
                Some(user) => Some(user),
                None => users.get_user_by_username(username_or_email).await?,
            }
        } else {
            match users.get_user_by_username(username_or_email).await? {
                Some(user) => Some(user),
                None => users.get_user_by_email(username_or_email).await?,
            }
        };

        let Some(user) = user else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        let token = create_token(&user.id, &user.username, user.role, &self.jwt_config)
            .map_err(|e| DomainError::Validation(format!("Failed to create token: {}", e)))?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }

    /// Self-service signup. Always creates a `User`-role account.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<Option<User>> {
        self.create(CreateUserDto {
            username: username.to_string(),
            email: email.to_string(),
            role: Some(UserRole::User),
            password: password.to_string(),
        })
        .await
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Create a user unless the email is already registered.
    ///
    /// Returns `Ok(None)` without inserting when an account with the email
    /// exists. A concurrent insert that slips past the check is rejected by
    /// the store with `Conflict`.
    pub async fn create(&self, dto: CreateUserDto) -> DomainResult<Option<User>> {
        if self.find_by_email(&dto.email).await?.is_some() {
            info!(email = %dto.email, "Signup rejected, email already registered");
            return Ok(None);
        }

        let password_hash = self.hash(&dto.password)?;
        let user = self
            .users()
            .create_user(NewUser {
                username: dto.username,
                email: dto.email,
                role: dto.role.unwrap_or_default(),
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "New user created");
        Ok(Some(user))
    }

    /// Overwrite the supplied profile fields. `None` if the user does not exist.
    pub async fn update_user_data(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        if dto.is_empty() {
            return self.find_by_id(id).await;
        }
        self.users().update_user(id, dto).await
    }

    /// Replace the password. `None` if the user does not exist.
    pub async fn update_password(&self, id: &str, new_password: &str) -> DomainResult<Option<User>> {
        let new_hash = self.hash(new_password)?;
        let updated = self.users().update_user_password(id, &new_hash).await?;
        if updated.is_some() {
            info!(user_id = id, "Password changed");
        }
        Ok(updated)
    }

    /// Change a user's own password. Verifies the current password first.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<User> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))?;

        let valid = verify_password(current_password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid current password".into()));
        }

        self.update_password(user_id, new_password)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))
    }

    /// Delete a user by ID and return the removed record.
    pub async fn delete_user(&self, id: &str) -> DomainResult<Option<User>> {
        let deleted = self.users().delete_user(id).await?;
        if let Some(user) = &deleted {
            info!(user_id = %user.id, "User deleted");
        }
        Ok(deleted)
    }

    /// Create the bootstrap admin when the user table is empty.
    pub async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<Option<User>> {
        if self.users().count_users().await? > 0 {
            return Ok(None);
        }

        info!("Creating default admin user...");
        let admin = self
            .create(CreateUserDto {
                username: username.to_string(),
                email: email.to_string(),
                role: Some(UserRole::Admin),
                password: password.to_string(),
            })
            .await?;
        if admin.is_some() {
            warn!("Default admin created: {}. Please change the admin password immediately!", email);
        }
        Ok(admin)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        self.users().get_user_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        self.users().get_user_by_email(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::crypto::jwt::verify_token;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            expiration_hours: 1,
            issuer: "bike-rental".into(),
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryRepositoryProvider::new()), jwt_config(), 4)
    }

    fn mock_user(username: &str, password: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.into(),
            email: email.into(),
            role: None,
            password: password.into(),
        }
    }

    /// Service seeded with three users, mirroring a small populated store.
    async fn seeded() -> (UserService, Vec<User>) {
        let service = service();
        let mut users = Vec::new();
        for (name, pass, email) in [
            ("username", "password", "email@test.com"),
            ("test2", "password2", "email2@test.com"),
            ("test3", "password3", "email3@test.com"),
        ] {
            users.push(service.create(mock_user(name, pass, email)).await.unwrap().unwrap());
        }
        (service, users)
    }

    #[tokio::test]
    async fn find_by_id_returns_stored_user() {
        let (service, users) = seeded().await;
        let found = service.find_by_id(&users[1].id).await.unwrap();
        assert_eq!(found, Some(users[1].clone()));
    }

    #[tokio::test]
    async fn find_by_id_unknown_returns_none() {
        let (service, _) = seeded().await;
        assert_eq!(service.find_by_id("432987532").await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_with_existing_email_returns_none_and_does_not_insert() {
        let (service, _) = seeded().await;
        let result = service
            .create(mock_user("someone", "password9", "email2@test.com"))
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(service.users().count_users().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn create_with_new_email_returns_user_with_fresh_id() {
        let (service, users) = seeded().await;
        let created = service
            .create(mock_user("test4", "password4", "newmail@test.com"))
            .await
            .unwrap()
            .unwrap();

        assert!(!created.id.is_empty());
        assert!(users.iter().all(|u| u.id != created.id));
        assert_eq!(created.username, "test4");
        assert_eq!(created.email, "newmail@test.com");
        assert_eq!(created.role, UserRole::User);
        assert_ne!(created.password_hash, "password4");
    }

    #[tokio::test]
    async fn find_by_email() {
        let (service, users) = seeded().await;
        assert_eq!(
            service.find_by_email("email@test.com").await.unwrap(),
            Some(users[0].clone())
        );
        assert_eq!(service.find_by_email("NotExistingEmail").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_user_data_returns_updated_user() {
        let (service, users) = seeded().await;
        let updated = service
            .update_user_data(
                &users[1].id,
                UpdateUserDto {
                    username: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.email, users[1].email);
        assert_eq!(updated.password_hash, users[1].password_hash);
        assert_eq!(service.find_by_id(&users[1].id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn update_password_returns_updated_user() {
        let (service, users) = seeded().await;
        let updated = service
            .update_password(&users[1].id, "brand-new-password")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, users[1].username);
        assert!(verify_password("brand-new-password", &updated.password_hash).unwrap());
        assert_eq!(service.update_password("missing", "x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let (service, users) = seeded().await;
        let err = service
            .change_password(&users[0].id, "wrong", "another-password")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        service
            .change_password(&users[0].id, "password", "another-password")
            .await
            .unwrap();
        assert!(service.login("username", "another-password").await.is_ok());
    }

    #[tokio::test]
    async fn delete_user_returns_deleted_user() {
        let (service, users) = seeded().await;
        let deleted = service.delete_user(&users[1].id).await.unwrap();
        assert_eq!(deleted, Some(users[1].clone()));
        assert_eq!(service.find_by_id(&users[1].id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn login_by_username_or_email_issues_token() {
        let (service, users) = seeded().await;

        let by_name = service.login("test2", "password2").await.unwrap();
        let claims = verify_token(&by_name.token, &jwt_config()).unwrap();
        assert_eq!(claims.sub, users[1].id);
        assert_eq!(claims.role(), Some(UserRole::User));
        assert_eq!(by_name.expires_in, 3600);

        let by_email = service.login("email2@test.com", "password2").await.unwrap();
        assert_eq!(by_email.user.id, users[1].id);
    }

    #[tokio::test]
    async fn email_login_is_not_shadowed_by_lookalike_username() {
        let service = service();
        let owner = service
            .create(mock_user("bob", "bobpass", "bob@x.com"))
            .await
            .unwrap()
            .unwrap();
        service
            .create(mock_user("bob@x.com", "otherpass", "squatter@x.com"))
            .await
            .unwrap()
            .unwrap();

        let result = service.login("bob@x.com", "bobpass").await.unwrap();
        assert_eq!(result.user.id, owner.id);
    }

    #[tokio::test]
    async fn login_with_bad_credentials_is_unauthorized() {
        let (service, _) = seeded().await;
        assert!(matches!(
            service.login("test2", "nope").await.unwrap_err(),
            DomainError::Unauthorized(_)
        ));
        assert!(matches!(
            service.login("ghost", "password").await.unwrap_err(),
            DomainError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn ensure_admin_only_runs_on_empty_store() {
        let service = service();
        let admin = service
            .ensure_admin("admin", "admin@test.com", "admin-password")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);

        let again = service
            .ensure_admin("admin2", "admin2@test.com", "admin-password")
            .await
            .unwrap();
        assert_eq!(again, None);
    }

    #[tokio::test]
    async fn signup_always_creates_user_role() {
        let service = service();
        let user = service
            .signup("rider", "rider@test.com", "password1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(service.signup("rider2", "rider@test.com", "password1").await.unwrap(), None);
    }
}
