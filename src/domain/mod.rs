//! Domain layer: entities, DTOs and repository interfaces

pub mod error;
pub mod repositories;
pub mod reservation;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use repositories::RepositoryProvider;
pub use reservation::{
    CreateReservationDto, Reservation, ReservationRepository, ReservationStatus,
    UpdateReservationDto,
};
pub use user::{CreateUserDto, NewUser, UpdateUserDto, User, UserRepositoryInterface, UserRole};
