//! In-process storage implementations

mod memory;

pub use memory::{InMemoryRepositoryProvider, InMemoryReservationRepository, InMemoryUserRepository};
