//! # Cartstream Load Balancer
//!
//! A reverse proxy that fronts multiple service replicas:
//!
//! - `POST /register {"url": "..."}` adds a backend (201 / 409 / 400)
//! - every other request is forwarded to the next healthy backend in
//!   round-robin order, or answered 503 when none is healthy
//! - one probe loop per backend polls `GET {url}/readyz` with a 5-second
//!   timeout; three consecutive failures eject the backend
//!
//! Probes are outbound HTTP calls straight to the backend, so a 200 means
//! the upstream actually answered — not merely that the proxy machinery
//! succeeded.

pub mod backend;
pub mod lb;
pub mod proxy;

pub use backend::Backend;
pub use lb::{LoadBalancer, RegisterError};
pub use proxy::build_router;
