//! Reservations module

pub mod service;

pub use service::ReservationService;
