//! Error types for the cart domain.

use cartstream_core::EventLogError;
use thiserror::Error;

/// Errors from cart commands, replay, and persistence.
///
/// Domain-rule variants are user-facing; the `Log` variant wraps the event
/// log's own errors (including version conflicts from concurrent writers).
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// `add` on a checked-out cart.
    #[error("cannot add items to a checked out cart")]
    AddToCheckedOut,

    /// `remove` on a checked-out cart.
    #[error("cannot remove items from a checked out cart")]
    RemoveFromCheckedOut,

    /// `checkout` on a cart that is already terminal.
    #[error("cart is already checked out")]
    AlreadyCheckedOut,

    /// An apply call received an empty batch.
    #[error("must apply at least 1 event")]
    NoEvents,

    /// Replay hit an event type this code does not know. Fatal: the code is
    /// older than the event log.
    #[error("not implemented")]
    UnknownEventType,

    /// An item event payload without a usable non-zero `item_id`.
    #[error("invalid or missing item_id")]
    InvalidItemId,

    /// A command addressed a cart with no event history.
    #[error("cart {0} not found")]
    NotFound(i64),

    /// The event log failed underneath a repository operation.
    #[error(transparent)]
    Log(#[from] EventLogError),
}

impl CheckoutError {
    /// Whether this error signals a concurrent writer on the same stream.
    ///
    /// The in-memory aggregate is stale in that case; callers must re-fetch
    /// rather than retry with the same instance.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Log(EventLogError::Conflict { .. }))
    }
}
