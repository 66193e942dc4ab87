//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{CreateReservationDto, Reservation, UpdateReservationDto};

/// Reservation API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationDto {
    pub id: String,
    pub user_id: String,
    pub bike_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// `pending`, `rented` or `returned`
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            status: r.status.as_str().to_string(),
            id: r.id,
            user_id: r.user_id,
            bike_id: r.bike_id,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub fn to_dtos(reservations: Vec<Reservation>) -> Vec<ReservationDto> {
    reservations.into_iter().map(ReservationDto::from).collect()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, message = "bike_id is required"))]
    pub bike_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl From<CreateReservationRequest> for CreateReservationDto {
    fn from(req: CreateReservationRequest) -> Self {
        Self {
            bike_id: req.bike_id,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
        }
    }
}

/// Fields left out are not changed
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReservationRequest {
    #[validate(length(min = 1, message = "bike_id must not be empty"))]
    pub bike_id: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<UpdateReservationRequest> for UpdateReservationDto {
    fn from(req: UpdateReservationRequest) -> Self {
        Self {
            bike_id: req.bike_id,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedReservation {
    pub id: String,
}
