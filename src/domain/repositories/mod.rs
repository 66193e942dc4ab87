//! Repository provider for the domain layer

use async_trait::async_trait;

use super::reservation::ReservationRepository;
use super::user::UserRepositoryInterface;
use super::DomainResult;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let user = repos.users().get_user_by_email("rider@example.com").await?;
///     let rents = repos.reservations().find_by_user_id(&user.id).await?;
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepositoryInterface;
    fn reservations(&self) -> &dyn ReservationRepository;

    /// Round-trip to the backing store, used by the health check
    async fn ping(&self) -> DomainResult<()>;
}
