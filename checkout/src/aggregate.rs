//! The cart aggregate: a state machine over cart events.
//!
//! Commands validate against current state and, when accepted, generate one
//! event which is applied locally and buffered for the next save. Event
//! application rules are identical for freshly generated events and for
//! replayed history — but only the command path buffers events, so loading
//! a cart never rewrites its past.

use std::fmt;
use std::sync::Arc;

use cartstream_core::{Clock, Event, EventSourcedAggregate, SystemClock};
use chrono::{DateTime, Utc};

use crate::error::CheckoutError;
use crate::{CART, CART_CHECKED_OUT, CART_CREATED, ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART};

/// The transient in-memory cart state, rebuilt by replay.
pub struct CartAggregate {
    base: EventSourcedAggregate,
    clock: Arc<dyn Clock>,
    /// Cart identifier.
    pub id: i64,
    /// Item identifiers in insertion order; duplicates allowed.
    pub contents: Vec<i64>,
    /// Once true, the cart is terminal.
    pub checked_out: bool,
    current_version: i32,
}

impl CartAggregate {
    /// Create a fresh cart with the system clock.
    #[must_use]
    pub fn new(cart_id: i64) -> Self {
        Self::with_clock(cart_id, Arc::new(SystemClock))
    }

    /// Create a fresh cart stamping new events with the given clock.
    #[must_use]
    pub fn with_clock(cart_id: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            base: EventSourcedAggregate::default(),
            clock,
            id: cart_id,
            contents: Vec::new(),
            checked_out: false,
            current_version: 0,
        }
    }

    /// Emit the creation event. Only valid on a fresh aggregate.
    ///
    /// # Errors
    ///
    /// Propagates apply failures; cannot fail on a fresh aggregate.
    pub fn init(&mut self) -> Result<(), CheckoutError> {
        let event = self.cart_created_event();
        self.apply(vec![event])
    }

    /// Add an item to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AddToCheckedOut`] once the cart is terminal.
    pub fn add(&mut self, item_id: i64) -> Result<(), CheckoutError> {
        if self.checked_out {
            return Err(CheckoutError::AddToCheckedOut);
        }
        let event = self.item_added_event(item_id);
        self.apply(vec![event])
    }

    /// Remove the first occurrence of an item from the cart.
    ///
    /// Removing an item that is not in the cart is a no-op: the command
    /// succeeds and emits nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::RemoveFromCheckedOut`] once the cart is
    /// terminal.
    pub fn remove(&mut self, item_id: i64) -> Result<(), CheckoutError> {
        if self.checked_out {
            return Err(CheckoutError::RemoveFromCheckedOut);
        }
        if self.contents.contains(&item_id) {
            let event = self.item_removed_event(item_id);
            return self.apply(vec![event]);
        }
        Ok(())
    }

    /// Check the cart out, making it terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AlreadyCheckedOut`] on a second checkout.
    pub fn checkout(&mut self) -> Result<(), CheckoutError> {
        if self.checked_out {
            return Err(CheckoutError::AlreadyCheckedOut);
        }
        let event = self.cart_checked_out_event();
        self.apply(vec![event])
    }

    /// Apply freshly generated events: mutate state and buffer them as
    /// uncommitted for the next save.
    ///
    /// Events are processed left to right; the first failure aborts and
    /// leaves state mutated only by the already-processed events — the
    /// caller discards the aggregate.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NoEvents`] on an empty batch
    /// - [`CheckoutError::UnknownEventType`] on an unrecognized type
    /// - [`CheckoutError::InvalidItemId`] on a malformed item payload
    pub fn apply(&mut self, events: Vec<Event>) -> Result<(), CheckoutError> {
        self.transition(&events)?;
        self.base.record(events);
        Ok(())
    }

    /// Apply historical events: mutate state without touching the
    /// uncommitted buffer, so a load followed by a save never rewrites
    /// history.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`apply`](Self::apply).
    pub fn replay(&mut self, events: Vec<Event>) -> Result<(), CheckoutError> {
        self.transition(&events)?;
        self.base.mark_replayed(events);
        Ok(())
    }

    fn transition(&mut self, events: &[Event]) -> Result<(), CheckoutError> {
        if events.is_empty() {
            return Err(CheckoutError::NoEvents);
        }

        for event in events {
            match event.event_type.as_str() {
                CART_CREATED => self.id = event.aggregate_id,
                ITEM_ADDED_TO_CART => {
                    let item_id = item_id_from(&event.data)?;
                    self.contents.push(item_id);
                }
                ITEM_REMOVED_FROM_CART => {
                    // History is truth: a remove for an absent item still
                    // applies cleanly.
                    let item_id = item_id_from(&event.data)?;
                    if let Some(index) = self.contents.iter().position(|&id| id == item_id) {
                        self.contents.remove(index);
                    }
                }
                CART_CHECKED_OUT => self.checked_out = true,
                _ => return Err(CheckoutError::UnknownEventType),
            }
        }

        self.current_version = events[events.len() - 1].version_id;
        Ok(())
    }

    /// Events generated this session and not yet persisted.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[Event] {
        self.base.uncommitted_events()
    }

    /// Move the uncommitted buffer into committed history. Idempotent.
    pub fn commit(&mut self) {
        self.base.commit();
    }

    /// Highest version observed, used to stamp new events.
    #[must_use]
    pub const fn current_version(&self) -> i32 {
        self.current_version
    }

    fn stamp(&self, event_type: &str, data: serde_json::Value) -> Event {
        Event {
            position: 0,
            event_type: event_type.to_string(),
            aggregate_type: CART.to_string(),
            aggregate_id: self.id,
            at: self.now(),
            version_id: self.current_version + 1,
            data,
        }
    }

    fn cart_created_event(&self) -> Event {
        self.stamp(CART_CREATED, serde_json::json!({}))
    }

    fn item_added_event(&self, item_id: i64) -> Event {
        self.stamp(ITEM_ADDED_TO_CART, serde_json::json!({ "item_id": item_id }))
    }

    fn item_removed_event(&self, item_id: i64) -> Event {
        self.stamp(ITEM_REMOVED_FROM_CART, serde_json::json!({ "item_id": item_id }))
    }

    fn cart_checked_out_event(&self) -> Event {
        self.stamp(CART_CHECKED_OUT, serde_json::json!({}))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl fmt::Debug for CartAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartAggregate")
            .field("id", &self.id)
            .field("contents", &self.contents)
            .field("checked_out", &self.checked_out)
            .field("current_version", &self.current_version)
            .finish_non_exhaustive()
    }
}

/// Decode the `item_id` payload field: present, integral, and non-zero.
fn item_id_from(data: &serde_json::Value) -> Result<i64, CheckoutError> {
    match data.get("item_id").and_then(serde_json::Value::as_i64) {
        Some(0) | None => Err(CheckoutError::InvalidItemId),
        Some(item_id) => Ok(item_id),
    }
}
