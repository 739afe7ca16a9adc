//! Breadth-first site crawling.
//!
//! The crawl runs in batches: up to `concurrency` frontier entries are
//! fetched in parallel, then the results are folded back into the frontier
//! sequentially. All shared state (frontier, visited paths, counters) is
//! only touched between batches, so none of it needs locking.

mod extract;
mod frontier;

pub use extract::{Extraction, extract_links};
pub use frontier::{Frontier, FrontierEntry};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::fetch::{FetchError, PageFetcher, PolitenessGate};
use crate::progress::{ProgressPhase, ProgressTracker};
use crate::robots::{BlockedCounter, RobotsResolver};
use crate::url::UrlFilters;

/// How a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// The frontier drained naturally.
    Completed,
    /// The page cap stopped the crawl with URLs still queued.
    LimitReached,
    /// The user interrupted the run.
    Cancelled,
}

/// First few failed URLs carried into the run's warning list; the rest
/// are only counted, like robots-blocked URLs.
const FAILURE_SAMPLE_LIMIT: usize = 3;

/// Result of crawling one site.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Canonical paths of every successfully fetched page.
    pub pages: BTreeSet<String>,
    pub state: CrawlState,
    /// Pages that failed to fetch (HTTP errors, timeouts past the seed).
    pub failed_pages: usize,
    /// Paths of the first few failed pages.
    pub failed_samples: Vec<String>,
    /// URLs skipped because robots.txt disallowed them.
    pub blocked_by_robots: usize,
    /// Frontier size at the moment the page cap hit. Zero otherwise.
    pub remaining_queue: usize,
}

/// Breadth-first crawler for a single site.
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    robots: Arc<RobotsResolver>,
    politeness: Arc<PolitenessGate>,
    filters: Arc<UrlFilters>,
    config: CrawlConfig,
    cancel: Arc<AtomicBool>,
}

impl Crawler {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        robots: Arc<RobotsResolver>,
        politeness: Arc<PolitenessGate>,
        filters: Arc<UrlFilters>,
        config: CrawlConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            fetcher,
            robots,
            politeness,
            filters,
            config,
            cancel,
        }
    }

    /// Crawls `site` breadth-first from its root.
    ///
    /// Individual page failures are logged and skipped. The only hard error
    /// is a connection-level failure on the seed itself; a site that cannot
    /// serve its homepage cannot be discovered at all.
    #[instrument(skip_all, fields(site = %site))]
    pub async fn crawl(
        &self,
        site: &Url,
        tracker: &mut ProgressTracker,
    ) -> Result<CrawlOutcome, FetchError> {
        let policy = self.robots.policy_for(site).await;
        let mut frontier = Frontier::new();
        let seed = crate::url::canonicalize(site.as_str(), site, &self.filters)
            .map_err(|_| FetchError::invalid_url(site.as_str(), "seed URL is not crawlable"))?;
        frontier.push(seed, 0);

        let mut pages: BTreeSet<String> = BTreeSet::new();
        let mut blocked = BlockedCounter::default();
        let mut failed_pages = 0usize;
        let mut failed_samples: Vec<String> = Vec::new();
        let mut seed_attempted = false;
        let state;

        tracker.set_phase(ProgressPhase::Crawl, 0, frontier.len());

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                state = CrawlState::Cancelled;
                break;
            }
            if pages.len() >= self.config.max_pages {
                state = CrawlState::LimitReached;
                break;
            }

            let room = self.config.max_pages - pages.len();
            let batch_size = self.config.concurrency.min(room);
            let mut batch = Vec::with_capacity(batch_size);
            while batch.len() < batch_size {
                let Some(entry) = frontier.pop() else { break };
                if !self.robots.is_allowed(&policy, entry.url.comparison_key()) {
                    blocked.record(&entry.url.as_full_url());
                    continue;
                }
                batch.push(entry);
            }
            if batch.is_empty() {
                if frontier.is_empty() {
                    state = CrawlState::Completed;
                    break;
                }
                continue;
            }

            let fetches = batch.into_iter().map(|entry| {
                let url = entry.url.as_full_url();
                async move {
                    self.politeness.acquire(&url).await;
                    let started = Instant::now();
                    let result = self.fetcher.fetch_page(&url).await;
                    (entry, result, started.elapsed())
                }
            });
            let results = join_all(fetches).await;

            for (entry, result, duration) in results {
                let is_seed = entry.depth == 0 && !seed_attempted;
                seed_attempted = true;
                match result {
                    Ok(page) => {
                        pages.insert(entry.url.comparison_key().to_string());
                        if entry.depth < self.config.max_depth {
                            let base = link_base(&page.final_url, site);
                            let extraction = extract_links(
                                &page.html,
                                &base,
                                &self.filters,
                                entry.depth == 0,
                            );
                            debug!(
                                url = %entry.url,
                                depth = entry.depth,
                                links = extraction.links.len(),
                                rejected = extraction.rejected,
                                "page fetched"
                            );
                            for link in extraction.links {
                                frontier.push(link, entry.depth + 1);
                            }
                        }
                        tracker.observe_estimate(pages.len() + frontier.len());
                        tracker.record_page(duration, pages.len(), frontier.len());
                    }
                    Err(err) if is_seed && err.is_connection_level() => {
                        return Err(err);
                    }
                    Err(FetchError::NotHtml { .. }) => {
                        // Reachable content, just not a source of links.
                        pages.insert(entry.url.comparison_key().to_string());
                        debug!(url = %entry.url, "non-HTML page; recorded without parsing");
                        tracker.record_page(duration, pages.len(), frontier.len());
                    }
                    Err(err) => {
                        failed_pages += 1;
                        if failed_samples.len() < FAILURE_SAMPLE_LIMIT {
                            failed_samples.push(entry.url.comparison_key().to_string());
                        }
                        warn!(url = %entry.url, error = %err, "page fetch failed; skipping");
                    }
                }
            }
        }

        let remaining_queue = if state == CrawlState::LimitReached {
            frontier.len()
        } else {
            0
        };
        blocked.log_summary(site.as_str());
        info!(
            site = %site,
            pages = pages.len(),
            failed = failed_pages,
            state = ?state,
            "crawl finished"
        );

        Ok(CrawlOutcome {
            pages,
            state,
            failed_pages,
            failed_samples,
            blocked_by_robots: blocked.count(),
            remaining_queue,
        })
    }
}

/// Base URL for resolving a page's relative links. Redirect targets on the
/// same site are honored; a cross-site redirect falls back to the seed so
/// foreign paths never leak into the comparison.
fn link_base(final_url: &str, site: &Url) -> Url {
    if let Ok(parsed) = Url::parse(final_url) {
        let final_host = parsed.host_str().unwrap_or_default().to_lowercase();
        let site_host = site.host_str().unwrap_or_default().to_lowercase();
        if crate::url::same_site(&final_host, &site_host) {
            return parsed;
        }
    }
    site.clone()
}
