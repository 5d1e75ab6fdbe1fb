//! Event log contract: the single append-only store of events.
//!
//! The log is the one shared mutable resource in the system. Writers append,
//! readers range-scan; records are never updated or deleted. The unique
//! constraint on `(aggregate_type, aggregate_id, version_id)` is the only
//! concurrency-safety mechanism against two writers on the same stream: the
//! first wins, the second gets [`EventLogError::Conflict`] and must not
//! retry with its stale in-memory aggregate.
//!
//! # Implementations
//!
//! - `PgEventLog` (in `cartstream-postgres`): production implementation
//! - `InMemoryEventLog` (in `cartstream-testing`): fast, deterministic tests
//!
//! # Dyn Compatibility
//!
//! The trait returns boxed futures instead of using `async fn` so the log
//! can be shared as an `Arc<dyn EventLog>` between the repository, the
//! subscription pumps, and the HTTP surface.

use crate::event::{Event, InvalidEvent};
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur during event log operations.
#[derive(Error, Debug)]
pub enum EventLogError {
    /// The per-aggregate version already exists: a concurrent writer got
    /// there first. The caller's aggregate is stale; do not retry blindly.
    #[error("version conflict on {aggregate_type}/{aggregate_id}: version {version_id} already exists")]
    Conflict {
        /// Kind of the aggregate that hit the conflict.
        aggregate_type: String,
        /// Instance that hit the conflict.
        aggregate_id: i64,
        /// The version that lost the race.
        version_id: i32,
    },

    /// Underlying store unavailable or query failed. Retryable upstream.
    #[error("database error: {0}")]
    Database(String),

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An event in the batch failed validation; the whole batch is rejected.
    #[error(transparent)]
    InvalidEvent(#[from] InvalidEvent),

    /// A positional range query was issued with no event types to match.
    #[error("type filter must name at least one event type")]
    EmptyTypeFilter,
}

/// The append-only event store.
///
/// # Ordering guarantees
///
/// - `append` assigns strictly increasing positions in insert order
/// - `range` returns events ordered by `position` ascending
/// - `by_aggregate` returns events ordered by `version_id` ascending
pub trait EventLog: Send + Sync {
    /// Append events in order, atomically.
    ///
    /// Every event must satisfy [`Event::validate`]; any violation rejects
    /// the whole batch. Either all events persist or none do.
    ///
    /// # Errors
    ///
    /// - [`EventLogError::Conflict`] when a `(aggregate_type, aggregate_id,
    ///   version_id)` triple already exists
    /// - [`EventLogError::InvalidEvent`] when validation fails
    /// - [`EventLogError::Database`] on storage failure
    fn append(&self, events: Vec<Event>) -> BoxFuture<'_, Result<(), EventLogError>>;

    /// Largest `position` currently in the log, or 0 when empty.
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::Database`] on storage failure.
    fn max_position(&self) -> BoxFuture<'_, Result<i64, EventLogError>>;

    /// Events with `start_exclusive < position <= end_inclusive` whose
    /// `event_type` is in `event_types`, ordered by position ascending.
    ///
    /// # Errors
    ///
    /// - [`EventLogError::EmptyTypeFilter`] when `event_types` is empty
    /// - [`EventLogError::Database`] on storage failure
    fn range<'a>(
        &'a self,
        start_exclusive: i64,
        end_inclusive: i64,
        event_types: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Vec<Event>, EventLogError>>;

    /// All events for one aggregate, ordered by `version_id` ascending.
    ///
    /// A stream with no events yields an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::Database`] on storage failure.
    fn by_aggregate<'a>(
        &'a self,
        aggregate_type: &'a str,
        aggregate_id: i64,
    ) -> BoxFuture<'a, Result<Vec<Event>, EventLogError>>;
}
