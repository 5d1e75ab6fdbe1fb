//! # Cartstream Checkout
//!
//! The cart domain: a state machine that validates commands and emits
//! events, the repository that replays and persists those events, and the
//! use-case layer the HTTP surface calls into.
//!
//! The aggregate is the only component allowed to mutate cart state. Every
//! accepted command generates exactly one event; rejected commands generate
//! nothing.

pub mod aggregate;
pub mod error;
pub mod repository;
pub mod service;

pub use aggregate::CartAggregate;
pub use error::CheckoutError;
pub use repository::{CartRepository, EventLogCartRepository};
pub use service::CheckoutService;

/// Aggregate type tag for cart streams.
pub const CART: &str = "cart";

/// Emitted once when a cart stream is initialized, always at version 1.
pub const CART_CREATED: &str = "cart.created";

/// Carries `{ "item_id": n }`.
pub const ITEM_ADDED_TO_CART: &str = "cart.item_added";

/// Carries `{ "item_id": n }`.
pub const ITEM_REMOVED_FROM_CART: &str = "cart.item_removed";

/// Terminal event; the cart accepts no commands afterwards.
pub const CART_CHECKED_OUT: &str = "cart.checked_out";
