//! Cartstream load balancer.
//!
//! Serves the backend registry and the round-robin reverse proxy.

use std::time::Duration;

use cartstream_loadbalancer::{build_router, LoadBalancer};
use cartstream_server::{init_tracing, shutdown_channel, shutdown_signal, LoadBalancerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let config = LoadBalancerConfig::from_env();

    let lb = LoadBalancer::new(
        Duration::from_secs(config.health_check_interval_secs),
        shutdown_channel(),
    );
    let app = build_router(lb);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "load balancer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("load balancer stopped");
    Ok(())
}
