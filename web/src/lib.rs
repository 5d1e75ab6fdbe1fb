//! # Cartstream Web
//!
//! The HTTP surface of the cart service: cart commands, event inspection,
//! inventory counts, and the liveness/readiness probes the load balancer
//! drives.
//!
//! Handlers are thin: they parse path parameters, call into the use-case
//! layer, and map domain errors onto HTTP statuses via [`AppError`].

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
