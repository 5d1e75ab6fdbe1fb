//! # Cartstream Core
//!
//! Core traits and types for the cartstream event-sourcing engine.
//!
//! This crate provides the fundamental abstractions shared by the write side,
//! the read side, and the test fakes:
//!
//! - **Event**: one immutable entry in the append-only log, addressed by a
//!   global `position` and a per-aggregate `version_id`
//! - **`EventSourcedAggregate`**: bookkeeping base tracking uncommitted
//!   versus committed events
//! - **`EventLog`**: the append-only store contract (positional range scans,
//!   per-aggregate loads)
//! - **`ProjectionWriter`**: the contract every read model implements
//!   (subscribed types, checkpoint, transactional apply)
//! - **`Clock`**: injectable time source for deterministic tests
//!
//! ## Architecture Principles
//!
//! - Events are the only source of truth; current state is derived by replay
//! - Writers append, readers range-scan; nothing is ever updated or deleted
//! - Each projection owns its state *and* its checkpoint, advanced together

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod aggregate;
pub mod environment;
pub mod event;
pub mod log;
pub mod projection;

pub use aggregate::EventSourcedAggregate;
pub use environment::{Clock, SystemClock};
pub use event::{Event, InvalidEvent};
pub use log::{EventLog, EventLogError};
pub use projection::{ProjectionError, ProjectionWriter};
