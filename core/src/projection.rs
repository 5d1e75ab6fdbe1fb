//! Projection writer contract: the read side of the system.
//!
//! A projection consumes the event log from a positional checkpoint and
//! maintains a denormalized view optimized for queries. Each projection owns
//! its tables *and* its checkpoint; [`ProjectionWriter::apply`] must advance
//! both in the same transaction. That single transaction boundary is what
//! turns at-least-once delivery into a correct read model: after a crash
//! mid-apply, checkpoint and state are either both updated or neither.
//!
//! Projections are independent of each other — no cross-projection ordering
//! is guaranteed, and each runs under its own subscription pump.

use crate::event::Event;
use crate::log::EventLogError;
use futures::future::BoxFuture;
use thiserror::Error;

/// Error type for projection operations.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Projection state storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Checkpoint could not be read or advanced.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// A subscribed event could not be processed.
    #[error("event processing error: {0}")]
    EventProcessing(String),

    /// Idempotent schema setup failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A projection must subscribe to at least one event type.
    #[error("projection must subscribe to at least one event type")]
    NoSubscribedEvents,

    /// The event log failed while feeding this projection.
    #[error("event log error: {0}")]
    Log(#[from] EventLogError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Contract every read model implements.
///
/// The subscription pump drives a writer through this interface: migrate
/// once, read the checkpoint, then apply batches of subscribed events in
/// `position` order until caught up.
///
/// # Batching
///
/// Batch size is a performance knob, not a correctness boundary — a writer
/// must produce the same final state under any batching of the same events.
pub trait ProjectionWriter: Send + Sync {
    /// Stable identifier used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Event types this projection consumes. Must be non-empty; it becomes
    /// the type filter for the log's range scans.
    fn subscribed_events(&self) -> &'static [&'static str];

    /// Idempotent setup of the projection's own tables and its single-row
    /// checkpoint (defaulting to position 0).
    fn apply_migration(&self) -> BoxFuture<'_, Result<()>>;

    /// The persisted checkpoint: the highest log position whose effect has
    /// been durably incorporated into this projection's state.
    fn latest_position(&self) -> BoxFuture<'_, Result<i64>>;

    /// Process a batch of events (ordered by position ascending) and advance
    /// the checkpoint to the batch's maximum position **in the same
    /// transaction** as the state update.
    fn apply<'a>(&'a self, events: &'a [Event]) -> BoxFuture<'a, Result<()>>;
}
