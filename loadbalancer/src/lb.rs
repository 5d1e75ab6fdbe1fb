//! Backend registry, round-robin dispatch, and probe loops.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::backend::Backend;

/// Per-probe request timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Consecutive probe failures before a backend is ejected.
const MAX_FAILED_PROBES: u32 = 3;

/// Registration failures, mapped to 400/409 by the HTTP layer.
#[derive(Error, Debug)]
pub enum RegisterError {
    /// The URL did not parse or is not http(s).
    #[error("invalid URL format: {0}")]
    InvalidUrl(String),

    /// The URL is already registered.
    #[error("server URL already exists: {0}")]
    Duplicate(String),
}

/// The server registry and dispatcher.
///
/// The registry is guarded by a read-write lock: dispatch takes the read
/// side, register/remove take the write side. The rotating cursor is a
/// separate atomic so concurrent dispatches do not serialize on the lock.
pub struct LoadBalancer {
    backends: RwLock<Vec<Arc<Backend>>>,
    cursor: AtomicUsize,
    health_check_interval: Duration,
    probe_client: reqwest::Client,
    proxy_client: reqwest::Client,
    shutdown: watch::Receiver<bool>,
}

impl LoadBalancer {
    /// Create a load balancer whose probe loops tick at
    /// `health_check_interval` and stop on the shutdown signal.
    #[must_use]
    pub fn new(health_check_interval: Duration, shutdown: watch::Receiver<bool>) -> Arc<Self> {
        let probe_client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_default();

        Arc::new(Self {
            backends: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            health_check_interval,
            probe_client,
            proxy_client: reqwest::Client::new(),
            shutdown,
        })
    }

    /// Validate and register a backend URL, then spawn its probe loop.
    ///
    /// Takes the shared handle because the probe loop needs its own
    /// reference to the registry for the eventual removal.
    ///
    /// # Errors
    ///
    /// - [`RegisterError::InvalidUrl`] when the URL does not parse or is
    ///   not http(s)
    /// - [`RegisterError::Duplicate`] when the URL is already registered
    pub fn register(self: Arc<Self>, raw_url: &str) -> Result<(), RegisterError> {
        let url = Url::parse(raw_url).map_err(|e| RegisterError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegisterError::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        let backend = {
            let mut backends = self.write_backends();
            if backends.iter().any(|existing| existing.url() == &url) {
                return Err(RegisterError::Duplicate(url.to_string()));
            }

            let backend = Arc::new(Backend::new(url));
            backends.push(backend.clone());
            backend
        };

        tracing::info!(url = %backend.url(), "backend registered");
        tokio::spawn(self.probe_loop(backend));
        Ok(())
    }

    /// The next healthy backend in round-robin order, or `None` when every
    /// registered backend is unhealthy.
    #[must_use]
    pub fn next_backend(&self) -> Option<Arc<Backend>> {
        let backends = self.read_backends();
        if backends.is_empty() {
            return None;
        }

        // Scan at most one full rotation.
        for _ in 0..backends.len() {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % backends.len();
            let candidate = &backends[index];
            if candidate.is_healthy() {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Snapshot of the registered backends.
    #[must_use]
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.read_backends().clone()
    }

    /// Number of registered backends.
    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.read_backends().len()
    }

    /// The client used to forward requests to backends.
    #[must_use]
    pub const fn proxy_client(&self) -> &reqwest::Client {
        &self.proxy_client
    }

    async fn probe_loop(self: Arc<Self>, backend: Arc<Backend>) {
        let mut shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.health_check_interval);
        // The first tick completes immediately; consume it so the first
        // probe lands one interval after registration.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    let failed_attempts = backend.readiness_probe(&self.probe_client).await;
                    if failed_attempts >= MAX_FAILED_PROBES {
                        self.remove(&backend);
                        return;
                    }
                }
            }
        }
    }

    fn remove(&self, backend: &Backend) {
        let mut backends = self.write_backends();
        match backends
            .iter()
            .position(|candidate| candidate.url() == backend.url())
        {
            Some(index) => {
                backends.remove(index);
                tracing::info!(url = %backend.url(), "backend removed from rotation");
            }
            // Two failure paths can race the same removal.
            None => tracing::warn!(url = %backend.url(), "backend already removed"),
        }
    }

    fn read_backends(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Backend>>> {
        self.backends
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_backends(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Backend>>> {
        self.backends
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
