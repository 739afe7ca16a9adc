//! Discovery progress reporting.
//!
//! Each site's discovery owns a [`ProgressTracker`] and publishes
//! [`ProgressSnapshot`] values over a watch channel; the CLI renders whatever
//! the latest snapshot says. Publishing is throttled once a crawl grows past
//! a hundred pages so the channel does not churn on every fetch.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::watch;

/// Per-page fetch durations kept for the moving-average ETA.
const DURATION_WINDOW: usize = 20;

/// Minimum samples before an ETA is offered at all.
const MIN_ETA_SAMPLES: usize = 2;

/// What one site's discovery is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Sitemap,
    Crawl,
    Done,
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sitemap => write!(f, "sitemap"),
            Self::Crawl => write!(f, "crawl"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Point-in-time view of one site's discovery.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub site: String,
    pub phase: ProgressPhase,
    pub pages: usize,
    pub queued: usize,
    /// High-water estimate of how many pages the site holds in total.
    pub total_estimate: usize,
    /// `pages` over `total_estimate`, clamped to 100.
    pub percentage: f64,
    pub elapsed: Duration,
    /// Estimated time remaining. `None` until enough samples exist.
    pub eta: Option<Duration>,
    pub finished: bool,
}

/// Publishes discovery progress for one site.
pub struct ProgressTracker {
    site: String,
    started: Instant,
    phase: ProgressPhase,
    durations: VecDeque<Duration>,
    /// High-water estimate of the observed page count. Only ever grows, so
    /// the rendered ETA does not jump around as the queue drains and refills.
    estimated_total: usize,
    /// Floor for the reported total. Kept out of the ETA so a small site
    /// does not project hours of remaining work toward an unreached cap.
    configured_max_pages: usize,
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressTracker {
    /// Creates a tracker and the receiver the renderer subscribes to.
    ///
    /// The estimate starts at the configured page cap so the percentage
    /// climbs toward it instead of reading complete whenever the queue
    /// momentarily drains.
    #[must_use]
    pub fn new(
        site: impl Into<String>,
        configured_max_pages: usize,
    ) -> (Self, watch::Receiver<ProgressSnapshot>) {
        let site = site.into();
        let initial = ProgressSnapshot {
            site: site.clone(),
            phase: ProgressPhase::Sitemap,
            pages: 0,
            queued: 0,
            total_estimate: configured_max_pages,
            percentage: 0.0,
            elapsed: Duration::ZERO,
            eta: None,
            finished: false,
        };
        let (tx, rx) = watch::channel(initial);
        (
            Self {
                site,
                started: Instant::now(),
                phase: ProgressPhase::Sitemap,
                durations: VecDeque::with_capacity(DURATION_WINDOW),
                estimated_total: 0,
                configured_max_pages,
                tx,
            },
            rx,
        )
    }

    /// Switches the reported phase and publishes immediately.
    pub fn set_phase(&mut self, phase: ProgressPhase, pages: usize, queued: usize) {
        self.phase = phase;
        self.publish(pages, queued, false);
    }

    /// Records one fetched page. Publishes on every page early on, then only
    /// every tenth page once past a hundred.
    pub fn record_page(&mut self, duration: Duration, pages: usize, queued: usize) {
        if self.durations.len() == DURATION_WINDOW {
            self.durations.pop_front();
        }
        self.durations.push_back(duration);
        if should_emit(pages) {
            self.publish(pages, queued, false);
        }
    }

    /// Publishes the terminal snapshot.
    pub fn finish(&mut self, pages: usize) {
        self.phase = ProgressPhase::Done;
        self.publish(pages, 0, true);
    }

    fn publish(&self, pages: usize, queued: usize, finished: bool) {
        let total_estimate = self
            .configured_max_pages
            .max(self.estimated_total)
            .max(pages + queued);
        let snapshot = ProgressSnapshot {
            site: self.site.clone(),
            phase: self.phase,
            pages,
            queued,
            total_estimate,
            percentage: percentage(pages, total_estimate),
            elapsed: self.started.elapsed(),
            eta: self.eta(pages, queued),
            finished,
        };
        // Receivers may all be gone (--no-progress); that is fine.
        let _ = self.tx.send(snapshot);
    }

    fn eta(&self, pages: usize, queued: usize) -> Option<Duration> {
        if self.durations.len() < MIN_ETA_SAMPLES {
            return None;
        }
        let total: Duration = self.durations.iter().sum();
        let avg = total / u32::try_from(self.durations.len()).unwrap_or(1);
        let estimate = self.estimated_total.max(pages + queued);
        let remaining = estimate.saturating_sub(pages);
        Some(avg * u32::try_from(remaining).unwrap_or(u32::MAX))
    }

    /// Raises the total-pages estimate; it never goes back down.
    pub fn observe_estimate(&mut self, candidate: usize) {
        self.estimated_total = self.estimated_total.max(candidate);
    }
}

fn should_emit(pages: usize) -> bool {
    pages <= 100 || pages % 10 == 0
}

fn percentage(pages: usize, total_estimate: usize) -> f64 {
    if total_estimate == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = pages as f64 / total_estimate as f64 * 100.0;
    pct.min(100.0)
}
