//! Shared application state for the HTTP handlers.

use std::sync::Arc;

use cartstream_checkout::CheckoutService;
use cartstream_core::EventLog;
use cartstream_projections::ItemCountRepository;

/// Dependencies the handlers pull out of the router.
#[derive(Clone)]
pub struct AppState {
    /// Cart use cases.
    pub service: Arc<CheckoutService>,
    /// The event log, for the event inspection endpoint.
    pub log: Arc<dyn EventLog>,
    /// Inventory counts read model.
    pub item_counts: Arc<dyn ItemCountRepository>,
}

impl AppState {
    /// Assemble the application state.
    #[must_use]
    pub fn new(
        service: Arc<CheckoutService>,
        log: Arc<dyn EventLog>,
        item_counts: Arc<dyn ItemCountRepository>,
    ) -> Self {
        Self {
            service,
            log,
            item_counts,
        }
    }
}
