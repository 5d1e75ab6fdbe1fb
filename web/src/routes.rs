//! Router configuration for the cart service.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{cart, events, health, inventory};
use crate::state::AppState;

/// Build the complete Axum router.
///
/// - Health probes (`/livez`, `/readyz`)
/// - Cart commands
/// - Event inspection
/// - Inventory counts (read side)
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .route("/cart/:cart_id", get(cart::cart_details))
        .route("/cart/:cart_id/checkout", post(cart::checkout))
        .route("/cart/:cart_id/:item_id", get(cart::add_item))
        .route("/cart/:cart_id/:item_id/delete", get(cart::remove_item))
        .route(
            "/events/:aggregate_type/:aggregate_id",
            get(events::aggregate_events),
        )
        .route("/inventory", get(inventory::item_counts))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::cart::CartResponse;
    use axum::extract::{Path, State};
    use cartstream_checkout::{CheckoutService, EventLogCartRepository};
    use cartstream_core::projection::Result as ProjectionResult;
    use cartstream_projections::{ItemCountRepository, ItemCountRow};
    use cartstream_testing::InMemoryEventLog;
    use futures::future::BoxFuture;
    use std::sync::Arc;

    struct NoCounts;

    impl ItemCountRepository for NoCounts {
        fn item_counts(&self) -> BoxFuture<'_, ProjectionResult<Vec<ItemCountRow>>> {
            Box::pin(async move { Ok(Vec::new()) })
        }
    }

    fn state() -> AppState {
        let log = Arc::new(InMemoryEventLog::new());
        let repository = Arc::new(EventLogCartRepository::new(log.clone()));
        AppState::new(
            Arc::new(CheckoutService::new(repository)),
            log,
            Arc::new(NoCounts),
        )
    }

    #[tokio::test]
    async fn cart_flow_over_the_handlers() {
        let state = state();

        let cart = cart::cart_details(State(state.clone()), Path(1001))
            .await
            .unwrap();
        assert_eq!(
            cart.0,
            CartResponse {
                cart_id: 1001,
                contents: vec![],
                checked_out: false,
            }
        );

        cart::add_item(State(state.clone()), Path((1001, 42)))
            .await
            .unwrap();
        cart::add_item(State(state.clone()), Path((1001, 43)))
            .await
            .unwrap();
        let cart = cart::remove_item(State(state.clone()), Path((1001, 42)))
            .await
            .unwrap();
        assert_eq!(cart.0.contents, vec![43]);

        let cart = cart::checkout(State(state.clone()), Path(1001)).await.unwrap();
        assert!(cart.0.checked_out);

        let err = cart::add_item(State(state.clone()), Path((1001, 1)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn events_endpoint_returns_the_audit_trail() {
        let state = state();

        cart::cart_details(State(state.clone()), Path(1001))
            .await
            .unwrap();
        cart::add_item(State(state.clone()), Path((1001, 42)))
            .await
            .unwrap();

        let events = events::aggregate_events(
            State(state.clone()),
            Path(("cart".to_string(), 1001)),
        )
        .await
        .unwrap();

        let types: Vec<&str> = events.0.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["cart.created", "cart.item_added"]);
    }
}
