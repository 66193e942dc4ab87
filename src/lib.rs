//! # Bike Rental Service
//!
//! REST backend for a bike rental shop: users book bikes for a time window,
//! admins hand bikes out (rent) and take them back (return).
//!
//! ## Architecture
//!
//! - **domain**: entities, DTOs, repository traits and `DomainError`
//! - **application**: `UserService` and `ReservationService`
//! - **infrastructure**: JWT / bcrypt, SeaORM persistence, in-memory storage
//! - **interfaces**: HTTP router, auth and role-guard middleware, handlers
//! - **shared**: graceful shutdown signal
//! - **server**: process lifecycle used by the binary

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};

pub use interfaces::http::{create_api_router, AppState};
