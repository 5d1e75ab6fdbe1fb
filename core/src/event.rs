//! The event record stored in the append-only log.
//!
//! Events represent facts about things that have happened in the past and are
//! immutable. Each record carries two ordering keys: `position`, the global
//! monotonic sequence assigned by the log on insert, and `version_id`, the
//! 1-based per-aggregate sequence stamped by the aggregate that generated it.
//!
//! Payloads are structured JSON so they round-trip unchanged through the
//! store's `jsonb` column; an empty object is valid for events whose
//! occurrence alone is meaningful.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failure for an event about to enter the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidEvent {
    /// `aggregate_id` must be positive.
    #[error("invalid aggregate ID")]
    AggregateId,

    /// `aggregate_type` must not be empty.
    #[error("aggregate type must not be empty")]
    EmptyAggregateType,

    /// `event_type` must not be empty.
    #[error("event type must not be empty")]
    EmptyEventType,

    /// `version_id` is 1-based.
    #[error("invalid version ID")]
    VersionId,
}

/// One entry in the event log.
///
/// # Ordering invariants
///
/// - `position` strictly increases in insert order across the whole log
///   (monotonic, not necessarily gapless)
/// - for any `(aggregate_type, aggregate_id)`, `version_id` runs 1..N with
///   no gaps and no duplicates
///
/// # Examples
///
/// ```
/// use cartstream_core::Event;
/// use chrono::Utc;
///
/// let event = Event {
///     position: 0, // assigned by the log on insert
///     event_type: "cart.item_added".to_string(),
///     aggregate_type: "cart".to_string(),
///     aggregate_id: 1001,
///     at: Utc::now(),
///     version_id: 2,
///     data: serde_json::json!({ "item_id": 42 }),
/// };
/// assert!(event.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Global monotonic sequence number. Zero until the log assigns one.
    pub position: i64,

    /// Namespaced type tag, e.g. `"cart.item_added"`.
    pub event_type: String,

    /// Kind of the owning aggregate, e.g. `"cart"`.
    pub aggregate_type: String,

    /// Identifier of the owning aggregate instance.
    pub aggregate_id: i64,

    /// Wall-clock time the event was generated.
    pub at: DateTime<Utc>,

    /// 1-based per-aggregate sequence number.
    pub version_id: i32,

    /// Opaque structured payload. May be an empty object.
    pub data: serde_json::Value,
}

impl Event {
    /// Check the write-side invariants before the event enters the log.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEvent`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), InvalidEvent> {
        if self.aggregate_id <= 0 {
            return Err(InvalidEvent::AggregateId);
        }
        if self.aggregate_type.is_empty() {
            return Err(InvalidEvent::EmptyAggregateType);
        }
        if self.event_type.is_empty() {
            return Err(InvalidEvent::EmptyEventType);
        }
        if self.version_id < 1 {
            return Err(InvalidEvent::VersionId);
        }
        Ok(())
    }
}
