//! Cartstream projections worker.
//!
//! Runs the inventory subscription pump against the event log until a
//! shutdown signal arrives. A projection apply failure aborts the process;
//! the supervisor decides the restart policy, and the untouched checkpoint
//! makes the restart resume at the failed batch.

use std::time::Duration;

use cartstream_postgres::PgEventLog;
use cartstream_projections::{InventoryProjection, Subscription};
use cartstream_server::{init_tracing, shutdown_channel, Config};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.conn_string)
        .await?;
    info!("connected to event store database");

    let log = PgEventLog::from_pool(pool.clone());
    let shutdown = shutdown_channel();

    let subscription = Subscription::new(
        InventoryProjection::new(pool),
        config.subscription.batch_size,
        Duration::from_secs(config.subscription.refresh_interval_secs),
    );

    info!(
        batch_size = config.subscription.batch_size,
        refresh_secs = config.subscription.refresh_interval_secs,
        "starting inventory projection"
    );

    subscription.listen(&log, shutdown).await?;

    info!("projections stopped");
    Ok(())
}
