//! Reservation aggregate
//!
//! Contains the Reservation entity, related DTOs, and repository interface.

pub mod model;
pub mod repository;

use chrono::{DateTime, Utc};

pub use model::{Reservation, ReservationStatus};
pub use repository::ReservationRepository;

/// Input for `ReservationService::create`
#[derive(Debug, Clone)]
pub struct CreateReservationDto {
    pub bike_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Partial overwrite of a reservation. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateReservationDto {
    pub bike_id: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}
