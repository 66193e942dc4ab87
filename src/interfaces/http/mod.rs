//! HTTP REST API interfaces
//!
//! - `middleware`: bearer authentication and per-route role guard
//! - `common`: response envelope, error mapping, validated JSON
//! - `modules`: handlers and DTOs per resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, AppState};
