//! User management: self-service profile and admin CRUD

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
