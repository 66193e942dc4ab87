use async_trait::async_trait;

use super::{NewUser, UpdateUserDto, User};
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepositoryInterface: Send + Sync {
    /// Insert a user. Fails with `Conflict` if the email or username is taken.
    async fn create_user(&self, user: NewUser) -> DomainResult<User>;

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn count_users(&self) -> DomainResult<u64>;

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>>;
    async fn update_user_password(
        &self,
        id: &str,
        new_password_hash: &str,
    ) -> DomainResult<Option<User>>;

    /// Remove a user and return the deleted record.
    async fn delete_user(&self, id: &str) -> DomainResult<Option<User>>;
}
