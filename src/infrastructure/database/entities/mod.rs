//! Database entities module

pub mod reservation;
pub mod user;

pub use reservation::Entity as Reservation;
pub use user::Entity as User;
