//! Configuration management for the cartstream binaries.
//!
//! Loads configuration from environment variables with sensible defaults;
//! only the database DSN is required.

use std::env;
use thiserror::Error;

/// A required environment variable is missing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The named variable must be set.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Configuration for the service and projections binaries.
#[derive(Debug, Clone)]
pub struct Config {
    /// Event store database.
    pub postgres: PostgresConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Projection subscription settings.
    pub subscription: SubscriptionConfig,
}

/// `PostgreSQL` configuration.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database DSN (required, `PG_CONNSTRING`).
    pub conn_string: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Load balancer base URL to self-register with, if any (`LB_ADDR`).
    pub lb_addr: Option<String>,
    /// URL to advertise at registration; defaults to
    /// `http://localhost:{port}`.
    pub advertise_url: Option<String>,
}

/// Subscription pump configuration.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Maximum events per database round-trip.
    pub batch_size: i64,
    /// Seconds between catch-up waves.
    pub refresh_interval_secs: u64,
}

/// Load balancer configuration, independent of the database.
#[derive(Debug, Clone)]
pub struct LoadBalancerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Seconds between readiness probes per backend.
    pub health_check_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when `PG_CONNSTRING` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            postgres: PostgresConfig {
                conn_string: env::var("PG_CONNSTRING")
                    .map_err(|_| ConfigError::MissingVar("PG_CONNSTRING"))?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5001),
                lb_addr: env::var("LB_ADDR").ok(),
                advertise_url: env::var("ADVERTISE_URL").ok(),
            },
            subscription: SubscriptionConfig {
                batch_size: env::var("SUBSCRIPTION_BATCH_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(25),
                refresh_interval_secs: env::var("SUBSCRIPTION_REFRESH_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
        })
    }
}

impl LoadBalancerConfig {
    /// Load configuration from environment variables. Nothing is required.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: env::var("LB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("LB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            health_check_interval_secs: env::var("HEALTH_CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}
