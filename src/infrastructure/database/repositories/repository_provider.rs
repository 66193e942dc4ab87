//! SeaORM implementation of RepositoryProvider

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::user::UserRepositoryInterface;
use crate::domain::{DomainError, DomainResult};

use super::reservation_repository::SeaOrmReservationRepository;
use super::user_repository::UserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let user = repos.users().get_user_by_id("id").await?;
/// let rents = repos.reservations().find_by_bike_id("bike-7").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    users: UserRepository,
    reservations: SeaOrmReservationRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepositoryInterface {
        &self.users
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    async fn ping(&self) -> DomainResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map(|_| ())
            .map_err(|e| DomainError::Storage(e.to_string()))
    }
}
