//! Application layer: use-case orchestration over the domain repositories

pub mod identity;
pub mod reservations;

pub use identity::{AuthResult, UserService};
pub use reservations::ReservationService;
