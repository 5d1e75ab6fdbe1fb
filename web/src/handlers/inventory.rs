//! Inventory counts: the sold/reserved read model.

use axum::extract::State;
use axum::Json;
use cartstream_projections::ItemCountRow;

use crate::error::AppError;
use crate::state::AppState;

/// `GET /inventory` — sold and reserved totals per item.
pub async fn item_counts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemCountRow>>, AppError> {
    let counts = state.item_counts.item_counts().await?;
    Ok(Json(counts))
}
