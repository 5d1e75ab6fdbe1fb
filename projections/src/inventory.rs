//! `PostgreSQL`-backed inventory projection.
//!
//! Maintains, per cart, a `checked_out` flag and a signed quantity per
//! `(cart_id, item_id)` pair. Sold versus reserved totals fall out of a
//! join at query time (see [`counts`](crate::counts)), so a remove that
//! crosses a batch boundary can never double-count a checked-out cart.
//!
//! Quantities may go negative in intermediate states: a projection whose
//! checkpoint starts above an add can legitimately see the matching remove
//! first. The event is authoritative; the row is inserted at -1.
//!
//! The batch apply and the checkpoint advance share one transaction —
//! that is the at-least-once delivery contract of the pump.

use cartstream_checkout::{CART_CHECKED_OUT, ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART};
use cartstream_core::projection::Result;
use cartstream_core::{Event, ProjectionError, ProjectionWriter};
use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

const SUBSCRIBED: &[&str] = &[ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART, CART_CHECKED_OUT];

/// Per-item inventory read model over cart events.
#[derive(Clone)]
pub struct InventoryProjection {
    pool: PgPool,
}

impl InventoryProjection {
    /// Create the projection over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn handle_item_added(
        tx: &mut Transaction<'_, Postgres>,
        event: &Event,
    ) -> Result<()> {
        let item_id = extract_item_id(&event.data)?;

        ensure_cart_row(tx, event.aggregate_id).await?;

        let updated = sqlx::query(
            r"
            UPDATE inventory.cart_items
            SET quantity = quantity + 1
            WHERE cart_id = $1 AND item_id = $2
            ",
        )
        .bind(event.aggregate_id)
        .bind(item_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ProjectionError::Storage(format!("update cart_items: {e}")))?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r"
                INSERT INTO inventory.cart_items (cart_id, item_id, quantity)
                VALUES ($1, $2, 1)
                ",
            )
            .bind(event.aggregate_id)
            .bind(item_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| ProjectionError::Storage(format!("insert cart_items: {e}")))?;
        }

        Ok(())
    }

    async fn handle_item_removed(
        tx: &mut Transaction<'_, Postgres>,
        event: &Event,
    ) -> Result<()> {
        let item_id = extract_item_id(&event.data)?;

        ensure_cart_row(tx, event.aggregate_id).await?;

        let updated = sqlx::query(
            r"
            UPDATE inventory.cart_items
            SET quantity = quantity - 1
            WHERE cart_id = $1 AND item_id = $2
            ",
        )
        .bind(event.aggregate_id)
        .bind(item_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ProjectionError::Storage(format!("update cart_items: {e}")))?;

        // A remove for an item this projection has never seen: the event is
        // authoritative, so the row starts at -1.
        if updated.rows_affected() == 0 {
            sqlx::query(
                r"
                INSERT INTO inventory.cart_items (cart_id, item_id, quantity)
                VALUES ($1, $2, -1)
                ",
            )
            .bind(event.aggregate_id)
            .bind(item_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| ProjectionError::Storage(format!("insert cart_items: {e}")))?;
        }

        Ok(())
    }

    async fn handle_cart_checked_out(
        tx: &mut Transaction<'_, Postgres>,
        event: &Event,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO inventory.carts (cart_id, checked_out)
            VALUES ($1, TRUE)
            ON CONFLICT (cart_id) DO UPDATE SET checked_out = TRUE
            ",
        )
        .bind(event.aggregate_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| ProjectionError::Storage(format!("update cart checked_out: {e}")))?;

        Ok(())
    }
}

async fn ensure_cart_row(tx: &mut Transaction<'_, Postgres>, cart_id: i64) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO inventory.carts (cart_id, checked_out)
        VALUES ($1, FALSE)
        ON CONFLICT (cart_id) DO NOTHING
        ",
    )
    .bind(cart_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| ProjectionError::Storage(format!("insert cart: {e}")))?;

    Ok(())
}

impl ProjectionWriter for InventoryProjection {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn subscribed_events(&self) -> &'static [&'static str] {
        SUBSCRIBED
    }

    fn apply_migration(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| ProjectionError::Migration(format!("begin transaction: {e}")))?;

            sqlx::query("CREATE SCHEMA IF NOT EXISTS inventory")
                .execute(&mut *tx)
                .await
                .map_err(|e| ProjectionError::Migration(format!("create schema: {e}")))?;

            sqlx::query(
                r"
                CREATE TABLE IF NOT EXISTS inventory.carts (
                    cart_id BIGINT PRIMARY KEY,
                    checked_out BOOLEAN NOT NULL DEFAULT FALSE
                )
                ",
            )
            .execute(&mut *tx)
            .await
            .map_err(|e| ProjectionError::Migration(format!("create carts table: {e}")))?;

            sqlx::query(
                r"
                CREATE TABLE IF NOT EXISTS inventory.cart_items (
                    cart_id BIGINT NOT NULL,
                    item_id BIGINT NOT NULL,
                    quantity INTEGER NOT NULL,
                    PRIMARY KEY (cart_id, item_id),
                    CONSTRAINT fk_cart_items_cart_id
                    FOREIGN KEY (cart_id) REFERENCES inventory.carts (cart_id)
                )
                ",
            )
            .execute(&mut *tx)
            .await
            .map_err(|e| ProjectionError::Migration(format!("create cart_items table: {e}")))?;

            sqlx::query(
                r"
                CREATE TABLE IF NOT EXISTS inventory.last_processed_position (
                    position BIGINT NOT NULL,
                    CONSTRAINT single_row CHECK (position >= 0)
                )
                ",
            )
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                ProjectionError::Migration(format!("create last_processed_position table: {e}"))
            })?;

            // Seed the single checkpoint row exactly once.
            sqlx::query(
                r"
                INSERT INTO inventory.last_processed_position (position)
                SELECT 0
                WHERE NOT EXISTS (
                    SELECT 1 FROM inventory.last_processed_position
                )
                ",
            )
            .execute(&mut *tx)
            .await
            .map_err(|e| ProjectionError::Migration(format!("seed checkpoint: {e}")))?;

            tx.commit()
                .await
                .map_err(|e| ProjectionError::Migration(format!("commit transaction: {e}")))?;

            Ok(())
        })
    }

    fn latest_position(&self) -> BoxFuture<'_, Result<i64>> {
        Box::pin(async move {
            let position: i64 = sqlx::query_scalar(
                r"
                SELECT position
                FROM inventory.last_processed_position
                LIMIT 1
                ",
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ProjectionError::Checkpoint(format!("read latest position: {e}")))?;

            Ok(position)
        })
    }

    fn apply<'a>(&'a self, events: &'a [Event]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if events.is_empty() {
                return Ok(());
            }

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| ProjectionError::Storage(format!("begin transaction: {e}")))?;

            let mut max_position: i64 = 0;

            for event in events {
                if event.position > max_position {
                    max_position = event.position;
                }

                match event.event_type.as_str() {
                    ITEM_ADDED_TO_CART => Self::handle_item_added(&mut tx, event).await?,
                    ITEM_REMOVED_FROM_CART => Self::handle_item_removed(&mut tx, event).await?,
                    CART_CHECKED_OUT => Self::handle_cart_checked_out(&mut tx, event).await?,
                    _ => {}
                }
            }

            // State and checkpoint advance together or not at all.
            sqlx::query(
                r"
                UPDATE inventory.last_processed_position
                SET position = $1
                ",
            )
            .bind(max_position)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                ProjectionError::Checkpoint(format!("update last_processed_position: {e}"))
            })?;

            tx.commit()
                .await
                .map_err(|e| ProjectionError::Storage(format!("commit transaction: {e}")))?;

            tracing::debug!(
                projection = self.name(),
                event_count = events.len(),
                position = max_position,
                "batch applied"
            );

            Ok(())
        })
    }
}

/// Extract the `item_id` from event data: present, integral, non-zero.
fn extract_item_id(data: &serde_json::Value) -> Result<i64> {
    match data.get("item_id").and_then(serde_json::Value::as_i64) {
        Some(0) | None => Err(ProjectionError::EventProcessing(
            "missing or invalid item_id in event data".to_string(),
        )),
        Some(item_id) => Ok(item_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribes_to_the_three_inventory_events() {
        assert_eq!(
            SUBSCRIBED,
            &[ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART, CART_CHECKED_OUT]
        );
    }

    #[test]
    fn extract_item_id_accepts_integers() {
        assert_eq!(
            extract_item_id(&serde_json::json!({ "item_id": 42 })).unwrap(),
            42
        );
    }

    #[test]
    fn extract_item_id_accepts_replayed_json() {
        let stored: serde_json::Value = serde_json::from_str(r#"{"item_id":42}"#).unwrap();
        assert_eq!(extract_item_id(&stored).unwrap(), 42);
    }

    #[test]
    fn extract_item_id_rejects_missing_zero_and_non_integer() {
        assert!(extract_item_id(&serde_json::json!({})).is_err());
        assert!(extract_item_id(&serde_json::json!({ "item_id": 0 })).is_err());
        assert!(extract_item_id(&serde_json::json!({ "item_id": "42" })).is_err());
        assert!(extract_item_id(&serde_json::json!({ "wrong_key": 42 })).is_err());
    }
}
