//! Cartstream HTTP service.
//!
//! Serves the cart API over the Postgres event log and, when `LB_ADDR` is
//! configured, registers itself with the load balancer on startup.

use std::sync::Arc;

use cartstream_checkout::{CheckoutService, EventLogCartRepository};
use cartstream_core::EventLog;
use cartstream_postgres::PgEventLog;
use cartstream_projections::PgItemCountRepository;
use cartstream_server::{init_tracing, shutdown_signal, Config};
use cartstream_web::{build_router, AppState};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let config = Config::from_env()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "starting cart service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.conn_string)
        .await?;
    info!("connected to event store database");

    let log: Arc<dyn EventLog> = Arc::new(PgEventLog::from_pool(pool.clone()));
    let repository = Arc::new(EventLogCartRepository::new(log.clone()));
    let service = Arc::new(CheckoutService::new(repository));
    let item_counts = Arc::new(PgItemCountRepository::new(pool));

    let state = AppState::new(service, log, item_counts);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "cart service listening");

    if let Some(lb_addr) = config.server.lb_addr.clone() {
        let advertise_url = config
            .server
            .advertise_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", config.server.port));
        tokio::spawn(register_with_load_balancer(lb_addr, advertise_url));
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Announce this replica to the load balancer. Failure is logged, not
/// fatal: the service still serves direct traffic.
async fn register_with_load_balancer(lb_addr: String, advertise_url: String) {
    let client = reqwest::Client::new();
    let result = client
        .post(format!("{lb_addr}/register"))
        .json(&serde_json::json!({ "url": advertise_url }))
        .send()
        .await;

    match result {
        Ok(response) if response.status() == reqwest::StatusCode::CREATED => {
            info!(url = %advertise_url, "registered with load balancer");
        }
        Ok(response) => {
            warn!(
                url = %advertise_url,
                status = %response.status(),
                "load balancer rejected registration"
            );
        }
        Err(error) => {
            warn!(url = %advertise_url, error = %error, "failed to reach load balancer");
        }
    }
}
