//! # Cartstream Projections
//!
//! The read side of the system: a batched positional catch-up pump
//! ([`Subscription`]) that ships events from the log into projection
//! writers, and the inventory read model it feeds.
//!
//! # Delivery model
//!
//! Each pump owns exactly one writer. Events are delivered at least once,
//! in `position` order, in contiguous windows; the writer's transactional
//! apply (state + checkpoint together) makes redelivery harmless. Multiple
//! pumps over different projections run independently in parallel; the same
//! projection must have only one pump active.

pub mod counts;
pub mod inventory;
pub mod subscription;

pub use counts::{ItemCount, ItemCountRow, ItemCountRepository, PgItemCountRepository};
pub use inventory::InventoryProjection;
pub use subscription::Subscription;
