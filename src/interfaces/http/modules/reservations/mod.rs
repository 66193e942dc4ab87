//! Reservations: booking, owner edits and admin rent / return

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
