//! Cart command handlers.

use axum::extract::{Path, State};
use axum::Json;
use cartstream_checkout::CartAggregate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Cart state as the API presents it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartResponse {
    /// Cart identifier.
    pub cart_id: i64,
    /// Item identifiers in insertion order.
    pub contents: Vec<i64>,
    /// Whether the cart is terminal.
    pub checked_out: bool,
}

impl From<&CartAggregate> for CartResponse {
    fn from(cart: &CartAggregate) -> Self {
        Self {
            cart_id: cart.id,
            contents: cart.contents.clone(),
            checked_out: cart.checked_out,
        }
    }
}

/// `GET /cart/:cart_id` — load the cart, creating it on first access.
pub async fn cart_details(
    State(state): State<AppState>,
    Path(cart_id): Path<i64>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.service.cart_details(cart_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// `GET /cart/:cart_id/:item_id` — add an item.
pub async fn add_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.service.add_item(cart_id, item_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// `GET /cart/:cart_id/:item_id/delete` — remove an item.
pub async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.service.remove_item(cart_id, item_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// `POST /cart/:cart_id/checkout` — check the cart out.
pub async fn checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<i64>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.service.checkout(cart_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}
