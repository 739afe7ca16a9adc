//! Per-host request spacing (politeness delay).
//!
//! Enforces a minimum interval between consecutive requests to the same
//! host. Different hosts never wait on each other, so the two site
//! discoveries running concurrently do not throttle one another.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Per-host minimum spacing between requests.
///
/// Designed to be wrapped in `Arc` and shared across the concurrent fetch
/// tasks of one crawl. A zero delay disables the gate entirely.
#[derive(Debug)]
pub struct PolitenessGate {
    delay: Duration,
    /// Per-host last-request slot. Arc lets us clone the state and release
    /// the `DashMap` shard lock before awaiting on the inner Mutex.
    hosts: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl PolitenessGate {
    /// Creates a gate with the given minimum inter-request delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            hosts: DashMap::new(),
        }
    }

    /// Creates a disabled gate that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether the gate is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    /// Waits until a request to `url`'s host is permitted, then records the
    /// request time. The first request to any host proceeds immediately.
    pub async fn acquire(&self, url: &str) {
        if self.is_disabled() {
            return;
        }

        let host = host_of(url);
        let slot = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        // Only the Mutex is held during the await; the DashMap shard lock
        // was released above.
        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let wait = self.delay.saturating_sub(elapsed);
                debug!(host = %host, wait_ms = wait.as_millis(), "politeness delay");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Extracts the host from a URL, falling back to a shared bucket for
/// unparseable inputs so they are still rate limited.
fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
