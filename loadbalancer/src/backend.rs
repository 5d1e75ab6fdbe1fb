//! A single registered backend and its probed health.

use std::sync::Mutex;

use axum::http::StatusCode;
use url::Url;

#[derive(Debug)]
struct Health {
    is_healthy: bool,
    failed_attempts: u32,
}

/// One registered service replica.
///
/// Health fields are guarded by a per-backend mutex: the probe loop writes
/// them, the dispatch path reads them.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    health: Mutex<Health>,
}

impl Backend {
    /// Register a backend. Starts healthy and stays dispatchable until a
    /// probe says otherwise.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self {
            url,
            health: Mutex::new(Health {
                is_healthy: true,
                failed_attempts: 0,
            }),
        }
    }

    /// The backend's base URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the last probe saw this backend ready.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.lock().is_healthy
    }

    /// Consecutive probe failures since the last success.
    #[must_use]
    pub fn failed_attempts(&self) -> u32 {
        self.lock().failed_attempts
    }

    /// Probe `GET {url}/readyz` and record the outcome.
    ///
    /// Anything but a 200 (including transport errors and the client's
    /// 5-second timeout) counts as a failure. Returns the consecutive
    /// failure count after this probe.
    pub async fn readiness_probe(&self, client: &reqwest::Client) -> u32 {
        let ready = match self.url.join("/readyz") {
            Ok(probe_url) => match client.get(probe_url).send().await {
                Ok(response) => response.status() == StatusCode::OK,
                Err(error) => {
                    tracing::debug!(url = %self.url, error = %error, "readiness probe failed");
                    false
                }
            },
            Err(error) => {
                tracing::debug!(url = %self.url, error = %error, "invalid probe URL");
                false
            }
        };

        let mut health = self.lock();
        if ready {
            health.is_healthy = true;
            health.failed_attempts = 0;
            tracing::debug!(url = %self.url, "backend is healthy");
        } else {
            health.is_healthy = false;
            health.failed_attempts += 1;
            tracing::warn!(
                url = %self.url,
                failed_attempts = health.failed_attempts,
                "backend is unhealthy"
            );
        }
        health.failed_attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Health> {
        self.health
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
