//! Reservation domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::DomainError;

/// Rental lifecycle of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    /// Booked, bike not yet handed out
    Pending,
    /// Bike is currently out with the customer
    Rented,
    /// Bike came back, reservation concluded
    Returned,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rented => "rented",
            Self::Returned => "returned",
        }
    }

    /// Whether moving from `self` to `next` follows the normal lifecycle
    /// (pending -> rented -> returned).
    ///
    /// Transitions are not rejected when this returns `false`; callers only
    /// report them.
    pub fn is_expected_transition(&self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Rented) | (Self::Rented, Self::Returned)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "rented" => Ok(Self::Rented),
            "returned" => Ok(Self::Returned),
            other => Err(DomainError::Validation(format!(
                "Unknown reservation status: {}",
                other
            ))),
        }
    }
}

/// A booking of one bike by one user for a time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: String,
    /// Owner of the reservation
    pub user_id: String,
    pub bike_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        user_id: impl Into<String>,
        bike_id: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            bike_id: bike_id.into(),
            starts_at,
            ends_at,
            status: ReservationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Pending or rented reservations still hold the bike
    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Returned
    }

    /// Half-open interval overlap: [starts_at, ends_at)
    pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_reservation() -> Reservation {
        let start = Utc::now();
        Reservation::new("user-1", "bike-7", start, start + Duration::hours(2))
    }

    #[test]
    fn new_reservation_is_pending() {
        let r = sample_reservation();
        assert_eq!(r.status, ReservationStatus::Pending);
        assert!(r.is_active());
        assert!(r.is_owned_by("user-1"));
        assert!(!r.is_owned_by("user-2"));
        assert!(!r.id.is_empty());
    }

    #[test]
    fn returned_reservation_is_not_active() {
        let mut r = sample_reservation();
        r.status = ReservationStatus::Returned;
        assert!(!r.is_active());
    }

    #[test]
    fn overlap_is_half_open() {
        let r = sample_reservation();
        assert!(r.overlaps(r.starts_at + Duration::minutes(30), r.ends_at + Duration::hours(1)));
        assert!(r.overlaps(r.starts_at - Duration::hours(1), r.starts_at + Duration::minutes(1)));
        // touching windows do not overlap
        assert!(!r.overlaps(r.ends_at, r.ends_at + Duration::hours(1)));
        assert!(!r.overlaps(r.starts_at - Duration::hours(1), r.starts_at));
    }

    #[test]
    fn expected_transitions() {
        use ReservationStatus::*;
        assert!(Pending.is_expected_transition(Rented));
        assert!(Rented.is_expected_transition(Returned));
        assert!(!Pending.is_expected_transition(Returned));
        assert!(!Returned.is_expected_transition(Rented));
        assert!(!Rented.is_expected_transition(Rented));
    }

    #[test]
    fn status_parses_from_storage_form() {
        assert_eq!("rented".parse::<ReservationStatus>().unwrap(), ReservationStatus::Rented);
        assert_eq!(ReservationStatus::Returned.to_string(), "returned");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("Accepted".parse::<ReservationStatus>().is_err());
    }
}
