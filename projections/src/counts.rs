//! Sold/reserved aggregation over the inventory projection.

use cartstream_core::projection::Result;
use cartstream_core::ProjectionError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Sold versus reserved totals for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCount {
    /// Quantity held in checked-out carts.
    pub sold: i64,
    /// Quantity held in open carts.
    pub reserved: i64,
}

/// One row of the inventory counts query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCountRow {
    /// Item identifier.
    pub id: i64,
    /// The item's counts.
    pub count: ItemCount,
}

/// Query contract for inventory counts.
pub trait ItemCountRepository: Send + Sync {
    /// Sold and reserved totals per item, across all carts.
    fn item_counts(&self) -> BoxFuture<'_, Result<Vec<ItemCountRow>>>;
}

/// `PostgreSQL` implementation over the inventory projection's tables.
#[derive(Clone)]
pub struct PgItemCountRepository {
    pool: PgPool,
}

impl PgItemCountRepository {
    /// Create the repository over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ItemCountRepository for PgItemCountRepository {
    fn item_counts(&self) -> BoxFuture<'_, Result<Vec<ItemCountRow>>> {
        Box::pin(async move {
            let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
                r"
                SELECT
                    ci.item_id,
                    COALESCE(SUM(
                        CASE
                            WHEN c.checked_out = TRUE THEN ci.quantity
                            ELSE 0
                        END
                    ), 0) AS sold_count,
                    COALESCE(SUM(
                        CASE
                            WHEN c.checked_out = FALSE THEN ci.quantity
                            ELSE 0
                        END
                    ), 0) AS reserved_count
                FROM inventory.cart_items ci
                JOIN inventory.carts c ON ci.cart_id = c.cart_id
                GROUP BY ci.item_id
                ORDER BY ci.item_id
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ProjectionError::Storage(format!("query item counts: {e}")))?;

            Ok(rows
                .into_iter()
                .map(|(id, sold, reserved)| ItemCountRow {
                    id,
                    count: ItemCount { sold, reserved },
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_count_row_serializes_with_nested_counts() {
        let row = ItemCountRow {
            id: 42,
            count: ItemCount {
                sold: 3,
                reserved: 1,
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 42, "count": { "sold": 3, "reserved": 1 } })
        );
    }
}
