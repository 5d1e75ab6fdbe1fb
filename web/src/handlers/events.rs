//! Event inspection: the audit trail for one aggregate.

use axum::extract::{Path, State};
use axum::Json;
use cartstream_core::Event;

use crate::error::AppError;
use crate::state::AppState;

/// `GET /events/:aggregate_type/:aggregate_id` — every event for one
/// aggregate, in version order.
pub async fn aggregate_events(
    State(state): State<AppState>,
    Path((aggregate_type, aggregate_id)): Path<(String, i64)>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.log.by_aggregate(&aggregate_type, aggregate_id).await?;
    Ok(Json(events))
}
