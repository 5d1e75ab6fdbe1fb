//! Apply the event store migrations.
//!
//! Idempotent; safe to run on every deploy before starting the service.

use cartstream_server::{init_tracing, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let config = Config::from_env()?;
    cartstream_postgres::run_migrations(&config.postgres.conn_string).await?;

    info!("event store migrations applied");
    Ok(())
}
