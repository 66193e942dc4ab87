use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};

use crate::domain::{
    DomainError, DomainResult, NewUser, UpdateUserDto, User, UserRepositoryInterface, UserRole,
};
use crate::infrastructure::database::entities::user;

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::User => UserRole::User,
    }
}

fn domain_role_to_entity(role: UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::User => user::UserRole::User,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

/// Unique-index violations become `Conflict`, everything else `Storage`.
fn write_err(e: sea_orm::DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::Conflict("Username or email already exists".to_string())
        }
        _ => db_err(e),
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepositoryInterface for UserRepository {
    async fn create_user(&self, new_user: NewUser) -> DomainResult<User> {
        let now = Utc::now();

        let model = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            role: Set(domain_role_to_entity(new_user.role)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(&self.db).await.map_err(write_err)?;
        Ok(user_model_to_domain(inserted))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();

        if let Some(username) = dto.username {
            active.username = Set(username);
        }
        if let Some(email) = dto.email {
            active.email = Set(email);
        }
        if let Some(role) = dto.role {
            active.role = Set(domain_role_to_entity(role));
        }

        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(write_err)?;
        Ok(Some(user_model_to_domain(updated)))
    }

    async fn update_user_password(
        &self,
        id: &str,
        new_password_hash: &str,
    ) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(new_password_hash.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await.map_err(db_err)?;

        Ok(Some(user_model_to_domain(updated)))
    }

    async fn delete_user(&self, id: &str) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(Some(user_model_to_domain(existing)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{init_database_with_migrations, DatabaseConfig};

    async fn repo() -> UserRepository {
        let db = init_database_with_migrations(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        UserRepository::new(db)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            role: UserRole::User,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_id_and_email() {
        let repo = repo().await;
        let created = repo.create_user(new_user("rider", "rider@test.com")).await.unwrap();
        assert!(!created.id.is_empty());

        let by_id = repo.get_user_by_id(&created.id).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&created));

        let by_email = repo.get_user_by_email("rider@test.com").await.unwrap();
        assert_eq!(by_email, Some(created));

        assert_eq!(repo.get_user_by_email("nobody@test.com").await.unwrap(), None);
        assert_eq!(repo.get_user_by_id("432987532").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = repo().await;
        repo.create_user(new_user("first", "same@test.com")).await.unwrap();

        let err = repo
            .create_user(new_user("second", "same@test.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_overwrites_only_given_fields() {
        let repo = repo().await;
        let created = repo.create_user(new_user("rider", "rider@test.com")).await.unwrap();

        let updated = repo
            .update_user(
                &created.id,
                UpdateUserDto {
                    username: Some("rider2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "rider2");
        assert_eq!(updated.email, "rider@test.com");
        assert_eq!(updated.password_hash, "hash");
    }

    #[tokio::test]
    async fn update_password_returns_post_update_record() {
        let repo = repo().await;
        let created = repo.create_user(new_user("rider", "rider@test.com")).await.unwrap();

        let updated = repo
            .update_user_password(&created.id, "new-hash")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.password_hash, "new-hash");
        assert_eq!(updated.username, "rider");

        assert_eq!(repo.update_user_password("missing", "x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_returns_deleted_user() {
        let repo = repo().await;
        let created = repo.create_user(new_user("rider", "rider@test.com")).await.unwrap();

        let deleted = repo.delete_user(&created.id).await.unwrap();
        assert_eq!(deleted, Some(created.clone()));
        assert_eq!(repo.get_user_by_id(&created.id).await.unwrap(), None);
        assert_eq!(repo.delete_user(&created.id).await.unwrap(), None);
    }
}
