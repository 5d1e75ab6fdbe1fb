//! Base bookkeeping for event-sourced aggregates.
//!
//! An aggregate accumulates two lists of events: *uncommitted* events
//! generated by commands this session and not yet persisted, and *committed*
//! events that are already part of durable history. The repository appends
//! the uncommitted batch to the log and then calls [`commit`] to move it
//! over.
//!
//! Replayed history goes through [`mark_replayed`] instead of [`record`] so
//! that loading an aggregate never re-buffers its own past — a `get`
//! followed by `save` must not rewrite history.
//!
//! [`commit`]: EventSourcedAggregate::commit
//! [`record`]: EventSourcedAggregate::record
//! [`mark_replayed`]: EventSourcedAggregate::mark_replayed

use crate::event::Event;

/// Tracks uncommitted versus committed events for one aggregate instance.
#[derive(Debug, Clone, Default)]
pub struct EventSourcedAggregate {
    committed: Vec<Event>,
    uncommitted: Vec<Event>,
}

impl EventSourcedAggregate {
    /// Buffer freshly generated events for the next save.
    pub fn record(&mut self, events: impl IntoIterator<Item = Event>) {
        self.uncommitted.extend(events);
    }

    /// Track replayed history without touching the uncommitted buffer.
    pub fn mark_replayed(&mut self, events: impl IntoIterator<Item = Event>) {
        self.committed.extend(events);
    }

    /// Events generated this session that have not been persisted yet.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[Event] {
        &self.uncommitted
    }

    /// Events that are already durable history.
    #[must_use]
    pub fn committed_events(&self) -> &[Event] {
        &self.committed
    }

    /// Move the uncommitted buffer into committed history.
    ///
    /// Idempotent: a second call finds an empty buffer and changes nothing.
    pub fn commit(&mut self) {
        self.committed.append(&mut self.uncommitted);
    }
}
