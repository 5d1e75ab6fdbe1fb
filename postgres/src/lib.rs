//! `PostgreSQL` event log implementation for cartstream.
//!
//! This crate provides the production [`EventLog`] backed by a single
//! append-only `events` table. It uses sqlx with connection pooling and
//! supports:
//!
//! - Transactional batch appends with per-event validation
//! - Conflict detection via the unique
//!   `(aggregate_type, aggregate_id, version_id)` constraint
//! - Positional range scans filtered by event type
//! - Per-aggregate loads in version order
//!
//! # Example
//!
//! ```no_run
//! use cartstream_postgres::PgEventLog;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let log = PgEventLog::connect("postgres://localhost/cartstream").await?;
//!     log.run_migrations().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use cartstream_core::{Event, EventLog, EventLogError};
use futures::future::BoxFuture;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

/// `PostgreSQL` error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// `PostgreSQL`-backed event log.
///
/// Positions are assigned by the `events` table's identity column, so they
/// strictly increase in insert order (monotonic; gapless is not guaranteed
/// because aborted transactions burn sequence values).
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Create a new event log from a database URL.
    ///
    /// This creates a connection pool with default settings (max 5
    /// connections).
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::Database`] if the URL is invalid or the
    /// database cannot be reached.
    pub async fn connect(database_url: &str) -> Result<Self, EventLogError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| EventLogError::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create a new event log from an existing connection pool.
    ///
    /// Useful when the pool is shared with other components (repositories,
    /// projections on the same database).
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations for the `events` table.
    ///
    /// Idempotent: already-applied migrations are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::Database`] if a migration fails to execute.
    pub async fn run_migrations(&self) -> Result<(), EventLogError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EventLogError::Database(format!("migration failed: {e}")))?;

        tracing::info!("event log migrations completed");
        Ok(())
    }
}

/// Run event log migrations against a database URL.
///
/// Convenience for startup scripts that migrate before constructing a
/// [`PgEventLog`]. Idempotent.
///
/// # Errors
///
/// Returns [`EventLogError::Database`] if the connection or a migration
/// fails.
pub async fn run_migrations(database_url: &str) -> Result<(), EventLogError> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .map_err(|e| EventLogError::Database(format!("connection failed: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| EventLogError::Database(format!("migration failed: {e}")))?;

    tracing::info!("event log migrations completed");
    Ok(())
}

const SELECT_COLUMNS: &str = "position, event_type, aggregate_type, aggregate_id, at, version_id, data";

fn decode_row(row: &PgRow) -> Result<Event, EventLogError> {
    let data: Option<serde_json::Value> = row
        .try_get("data")
        .map_err(|e| EventLogError::Serialization(e.to_string()))?;

    Ok(Event {
        position: row
            .try_get("position")
            .map_err(|e| EventLogError::Serialization(e.to_string()))?,
        event_type: row
            .try_get("event_type")
            .map_err(|e| EventLogError::Serialization(e.to_string()))?,
        aggregate_type: row
            .try_get("aggregate_type")
            .map_err(|e| EventLogError::Serialization(e.to_string()))?,
        aggregate_id: row
            .try_get("aggregate_id")
            .map_err(|e| EventLogError::Serialization(e.to_string()))?,
        at: row
            .try_get("at")
            .map_err(|e| EventLogError::Serialization(e.to_string()))?,
        version_id: row
            .try_get("version_id")
            .map_err(|e| EventLogError::Serialization(e.to_string()))?,
        data: data.unwrap_or(serde_json::Value::Null),
    })
}

impl EventLog for PgEventLog {
    fn append(&self, events: Vec<Event>) -> BoxFuture<'_, Result<(), EventLogError>> {
        Box::pin(async move {
            let start = std::time::Instant::now();

            if events.is_empty() {
                return Ok(());
            }

            // The whole batch is rejected before any row is written.
            for event in &events {
                event.validate()?;
            }

            tracing::debug!(event_count = events.len(), "appending events");
            // Note: Precision loss for counts > 2^52 is acceptable
            #[allow(clippy::cast_precision_loss)]
            metrics::histogram!("event_log.append.event_count").record(events.len() as f64);

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| EventLogError::Database(e.to_string()))?;

            for event in &events {
                let result = sqlx::query(
                    r"
                    INSERT INTO events (event_type, aggregate_type, aggregate_id, at, version_id, data)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ",
                )
                .bind(&event.event_type)
                .bind(&event.aggregate_type)
                .bind(event.aggregate_id)
                .bind(event.at)
                .bind(event.version_id)
                .bind(&event.data)
                .execute(&mut *tx)
                .await;

                if let Err(e) = result {
                    // Unique violation on (aggregate_type, aggregate_id,
                    // version_id) means a concurrent writer won the race.
                    if let Some(db_err) = e.as_database_error() {
                        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                            tracing::warn!(
                                aggregate_type = %event.aggregate_type,
                                aggregate_id = event.aggregate_id,
                                version_id = event.version_id,
                                "concurrent writer detected via unique constraint"
                            );
                            return Err(EventLogError::Conflict {
                                aggregate_type: event.aggregate_type.clone(),
                                aggregate_id: event.aggregate_id,
                                version_id: event.version_id,
                            });
                        }
                    }
                    return Err(EventLogError::Database(e.to_string()));
                }
            }

            tx.commit()
                .await
                .map_err(|e| EventLogError::Database(e.to_string()))?;

            metrics::histogram!("event_log.append.duration_seconds")
                .record(start.elapsed().as_secs_f64());
            metrics::counter!("event_log.append.total", "result" => "success").increment(1);

            Ok(())
        })
    }

    fn max_position(&self) -> BoxFuture<'_, Result<i64, EventLogError>> {
        Box::pin(async move {
            // COALESCE handles the empty log.
            let max_position: i64 =
                sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) FROM events")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| EventLogError::Database(e.to_string()))?;

            Ok(max_position)
        })
    }

    fn range<'a>(
        &'a self,
        start_exclusive: i64,
        end_inclusive: i64,
        event_types: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Vec<Event>, EventLogError>> {
        Box::pin(async move {
            if event_types.is_empty() {
                return Err(EventLogError::EmptyTypeFilter);
            }

            let types: Vec<String> = event_types.iter().map(|t| (*t).to_string()).collect();

            let rows = sqlx::query(&format!(
                r"
                SELECT {SELECT_COLUMNS}
                FROM events
                WHERE position > $1 AND position <= $2
                AND event_type = ANY($3)
                ORDER BY position ASC
                ",
            ))
            .bind(start_exclusive)
            .bind(end_inclusive)
            .bind(&types)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EventLogError::Database(e.to_string()))?;

            let events: Vec<Event> = rows
                .iter()
                .map(decode_row)
                .collect::<Result<_, _>>()?;

            tracing::debug!(
                start_exclusive,
                end_inclusive,
                event_count = events.len(),
                "loaded event range"
            );
            #[allow(clippy::cast_precision_loss)]
            metrics::histogram!("event_log.range.event_count").record(events.len() as f64);

            Ok(events)
        })
    }

    fn by_aggregate<'a>(
        &'a self,
        aggregate_type: &'a str,
        aggregate_id: i64,
    ) -> BoxFuture<'a, Result<Vec<Event>, EventLogError>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {SELECT_COLUMNS}
                FROM events
                WHERE aggregate_type = $1 AND aggregate_id = $2
                ORDER BY version_id ASC
                ",
            ))
            .bind(aggregate_type)
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EventLogError::Database(e.to_string()))?;

            rows.iter().map(decode_row).collect()
        })
    }
}
