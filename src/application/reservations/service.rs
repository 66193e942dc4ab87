//! Reservation service: booking and rental lifecycle
//!
//! Creation, owner-scoped edits and the admin rent / return transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    CreateReservationDto, DomainError, DomainResult, RepositoryProvider, Reservation,
    ReservationRepository, ReservationStatus, UpdateReservationDto,
};

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
}

fn check_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> DomainResult<()> {
    if ends_at <= starts_at {
        return Err(DomainError::Validation(
            "Reservation must end after it starts".into(),
        ));
    }
    Ok(())
}

impl ReservationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        self.repos.reservations()
    }

    /// Book `bike_id` for `owner_id` and return the new reservation id.
    ///
    /// Overlapping bookings of the same bike are accepted and only logged.
    pub async fn create(&self, dto: CreateReservationDto, owner_id: &str) -> DomainResult<String> {
        check_window(dto.starts_at, dto.ends_at)?;

        let clashes = self
            .reservations()
            .find_by_bike_id(&dto.bike_id)
            .await?
            .into_iter()
            .filter(|r| r.is_active() && r.overlaps(dto.starts_at, dto.ends_at))
            .count();
        if clashes > 0 {
            warn!(
                bike_id = %dto.bike_id,
                clashes,
                "Reservation overlaps an active reservation of the same bike"
            );
        }

        let reservation = Reservation::new(owner_id, dto.bike_id, dto.starts_at, dto.ends_at);
        let id = reservation.id.clone();
        self.reservations().save(reservation).await?;

        metrics::counter!("reservations_created_total").increment(1);
        info!(reservation_id = %id, user_id = owner_id, "Reservation created");
        Ok(id)
    }

    pub async fn get_reservation(&self, id: &str) -> DomainResult<Option<Reservation>> {
        self.reservations().find_by_id(id).await
    }

    pub async fn get_all_reservations(&self) -> DomainResult<Vec<Reservation>> {
        self.reservations().find_all().await
    }

    pub async fn get_reservations_by_user_id(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        self.reservations().find_by_user_id(user_id).await
    }

    pub async fn get_reservations_by_bike_id(&self, bike_id: &str) -> DomainResult<Vec<Reservation>> {
        self.reservations().find_by_bike_id(bike_id).await
    }

    /// Reservations whose bike is currently out
    pub async fn get_present_rents(&self) -> DomainResult<Vec<Reservation>> {
        self.reservations()
            .find_by_status(ReservationStatus::Rented)
            .await
    }

    /// Load a reservation that `actor_id` is allowed to modify.
    async fn owned(&self, id: &str, actor_id: &str) -> DomainResult<Reservation> {
        let reservation = self
            .get_reservation(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", id))?;
        if !reservation.is_owned_by(actor_id) {
            return Err(DomainError::Forbidden(
                "Reservation belongs to another user".into(),
            ));
        }
        Ok(reservation)
    }

    /// Overwrite the supplied fields of a reservation owned by `actor_id`.
    pub async fn update_reservation(
        &self,
        id: &str,
        dto: UpdateReservationDto,
        actor_id: &str,
    ) -> DomainResult<Reservation> {
        let current = self.owned(id, actor_id).await?;
        check_window(
            dto.starts_at.unwrap_or(current.starts_at),
            dto.ends_at.unwrap_or(current.ends_at),
        )?;

        let updated = self
            .reservations()
            .update(id, dto)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", id))?;
        debug!(reservation_id = id, "Reservation updated");
        Ok(updated)
    }

    /// Delete a reservation owned by `actor_id`.
    pub async fn delete_reservation(&self, id: &str, actor_id: &str) -> DomainResult<()> {
        self.owned(id, actor_id).await?;
        if !self.reservations().delete(id).await? {
            return Err(DomainError::not_found("Reservation", "id", id));
        }
        info!(reservation_id = id, "Reservation deleted");
        Ok(())
    }

    /// Mark the bike as handed out. `None` if the reservation does not exist.
    pub async fn rent_bike(&self, id: &str) -> DomainResult<Option<Reservation>> {
        self.transition(id, ReservationStatus::Rented).await
    }

    /// Mark the bike as brought back. `None` if the reservation does not exist.
    pub async fn return_bike(&self, id: &str) -> DomainResult<Option<Reservation>> {
        self.transition(id, ReservationStatus::Returned).await
    }

    async fn transition(
        &self,
        id: &str,
        next: ReservationStatus,
    ) -> DomainResult<Option<Reservation>> {
        let Some(current) = self.get_reservation(id).await? else {
            return Ok(None);
        };

        if !current.status.is_expected_transition(next) {
            warn!(
                reservation_id = id,
                from = %current.status,
                to = %next,
                "Unexpected reservation status transition"
            );
            metrics::counter!("reservation_unexpected_transitions_total", "to" => next.as_str())
                .increment(1);
        }

        let updated = self.reservations().set_status(id, next).await?;
        if updated.is_some() {
            metrics::counter!("reservation_transitions_total", "to" => next.as_str()).increment(1);
            info!(reservation_id = id, from = %current.status, to = %next, "Reservation status changed");
        }
        Ok(updated)
    }
}
