//! Reservation repository interface

use async_trait::async_trait;

use super::model::{Reservation, ReservationStatus};
use super::UpdateReservationDto;
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Save a new reservation
    async fn save(&self, reservation: Reservation) -> DomainResult<()>;

    /// Find reservation by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>>;

    /// Find all reservations (any status)
    async fn find_all(&self) -> DomainResult<Vec<Reservation>>;

    /// Find all reservations owned by a user
    async fn find_by_user_id(&self, user_id: &str) -> DomainResult<Vec<Reservation>>;

    /// Find all reservations for a bike
    async fn find_by_bike_id(&self, bike_id: &str) -> DomainResult<Vec<Reservation>>;

    /// Find all reservations currently in `status`
    async fn find_by_status(&self, status: ReservationStatus) -> DomainResult<Vec<Reservation>>;

    /// Overwrite the supplied fields. `None` if the id is unknown.
    async fn update(
        &self,
        id: &str,
        dto: UpdateReservationDto,
    ) -> DomainResult<Option<Reservation>>;

    /// Set the status and return the updated reservation. `None` if the id is unknown.
    async fn set_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> DomainResult<Option<Reservation>>;

    /// Delete by id. Returns `false` if nothing was deleted.
    async fn delete(&self, id: &str) -> DomainResult<bool>;
}
