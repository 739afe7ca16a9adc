//! Discovery orchestration: one site end to end, then the two-site run.
//!
//! A site is discovered by sitemap, by crawl, or by both. A crawl that
//! comes back thin (a blocked or script-only homepage starves the
//! frontier) automatically retries via the sitemap and keeps whichever
//! result is larger; combined mode always runs both and unions them.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use crate::compare::Comparison;
use crate::config::{ConfigError, CrawlConfig};
use crate::crawl::{CrawlState, Crawler};
use crate::fetch::{FetchError, HttpFetcher, PolitenessGate};
use crate::progress::{ProgressPhase, ProgressTracker};
use crate::robots::RobotsResolver;
use crate::sitemap::SitemapScanner;
use crate::url::{FilterError, UrlFilters};

/// Crawl results below this page count trigger the sitemap fallback.
pub const DEFAULT_FALLBACK_THRESHOLD: usize = 10;

/// How pages should be discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    /// Sitemap only. No fallback logic applies.
    Sitemap,
    /// Crawl, with an automatic sitemap fallback when the crawl is thin.
    Crawl,
    /// Sitemap and crawl, results unioned. No fallback logic applies.
    Combined,
}

/// What actually happened, as opposed to what was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodUsed {
    Sitemap,
    Crawl,
    CrawlWithSitemapFallback,
    Combined,
}

impl std::fmt::Display for MethodUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sitemap => write!(f, "sitemap"),
            Self::Crawl => write!(f, "crawl"),
            Self::CrawlWithSitemapFallback => write!(f, "crawl + sitemap fallback"),
            Self::Combined => write!(f, "sitemap + crawl"),
        }
    }
}

/// Everything learned about one site.
#[derive(Debug)]
pub struct DiscoveredSite {
    pub site: Url,
    pub pages: BTreeSet<String>,
    pub method_used: MethodUsed,
    /// How the crawl ended, when one ran.
    pub crawl_state: Option<CrawlState>,
    pub blocked_by_robots: usize,
    pub failed_pages: usize,
    /// URLs still queued when the page cap hit.
    pub remaining_queue: usize,
    pub warnings: Vec<String>,
}

/// A completed two-site run.
#[derive(Debug)]
pub struct ComparisonRun {
    pub old: DiscoveredSite,
    pub new: DiscoveredSite,
    pub comparison: Comparison,
}

/// A run-level failure. Per-page and per-sitemap problems degrade to
/// warnings; these abort the run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot reach {site}: {source}")]
    SiteUnreachable {
        site: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Filters(#[from] FilterError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl DiscoveryError {
    fn site_unreachable(site: &Url, source: FetchError) -> Self {
        Self::SiteUnreachable {
            site: site.to_string(),
            source,
        }
    }
}

enum Phase {
    Sitemap,
    Crawl,
    SitemapFallback,
    Done,
}

/// Runs discovery for both sites and compares the results.
pub struct DiscoveryEngine {
    scanner: SitemapScanner,
    crawler: Crawler,
    robots: Arc<RobotsResolver>,
    method: DiscoveryMethod,
    fallback_threshold: usize,
}

impl DiscoveryEngine {
    /// Builds the engine and its HTTP stack from `config`.
    pub fn new(
        config: CrawlConfig,
        method: DiscoveryMethod,
        fallback_threshold: usize,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, DiscoveryError> {
        config.validate()?;
        let filters = Arc::new(UrlFilters::from_patterns(&config.extra_filters)?);
        let fetcher = Arc::new(HttpFetcher::new(
            config.request_timeout,
            &config.custom_headers,
            config.auth.clone(),
            None,
        )?);
        let client = fetcher.inner().clone();
        let robots = Arc::new(RobotsResolver::new(client.clone(), config.ignore_robots));
        let politeness = Arc::new(PolitenessGate::new(config.crawl_delay));
        let scanner = SitemapScanner::new(client, Arc::clone(&filters));
        let crawler = Crawler::new(
            fetcher,
            Arc::clone(&robots),
            politeness,
            filters,
            config,
            cancel,
        );
        Ok(Self {
            scanner,
            crawler,
            robots,
            method,
            fallback_threshold,
        })
    }

    /// Discovers both sites concurrently and computes their difference.
    pub async fn run(
        &self,
        old_site: &Url,
        new_site: &Url,
        old_tracker: &mut ProgressTracker,
        new_tracker: &mut ProgressTracker,
    ) -> Result<ComparisonRun, DiscoveryError> {
        let (old, new) = tokio::join!(
            self.discover_site(old_site, old_tracker),
            self.discover_site(new_site, new_tracker),
        );
        let (old, new) = (old?, new?);
        let comparison = Comparison::compute(&old.pages, &new.pages);
        info!(
            old_pages = old.pages.len(),
            new_pages = new.pages.len(),
            matched = comparison.matched.len(),
            missing = comparison.missing.len(),
            added = comparison.added.len(),
            "comparison computed"
        );
        Ok(ComparisonRun {
            old,
            new,
            comparison,
        })
    }

    /// Discovers one site according to the configured method.
    #[instrument(skip_all, fields(site = %site))]
    pub async fn discover_site(
        &self,
        site: &Url,
        tracker: &mut ProgressTracker,
    ) -> Result<DiscoveredSite, DiscoveryError> {
        let policy = self.robots.policy_for(site).await;
        let mut pages: BTreeSet<String> = BTreeSet::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut crawl_state = None;
        let mut blocked_by_robots = 0;
        let mut failed_pages = 0;
        let mut remaining_queue = 0;
        let mut method_used = match self.method {
            DiscoveryMethod::Sitemap => MethodUsed::Sitemap,
            DiscoveryMethod::Crawl => MethodUsed::Crawl,
            DiscoveryMethod::Combined => MethodUsed::Combined,
        };

        let mut phase = match self.method {
            DiscoveryMethod::Crawl => Phase::Crawl,
            _ => Phase::Sitemap,
        };

        loop {
            match phase {
                Phase::Sitemap => {
                    tracker.set_phase(ProgressPhase::Sitemap, 0, 0);
                    let outcome = self.scanner.discover(site, policy.sitemap_urls()).await;
                    warnings.extend(outcome.warnings);
                    pages.extend(outcome.pages);

                    phase = match self.method {
                        DiscoveryMethod::Combined => Phase::Crawl,
                        _ => Phase::Done,
                    };
                }
                Phase::Crawl => {
                    if policy.fully_blocks() && !self.robots.ignores_directives() {
                        let message = format!(
                            "robots.txt on {site} disallows all crawling; expect a thin crawl"
                        );
                        warn!("{message}");
                        warnings.push(message);
                    }
                    let outcome = self
                        .crawler
                        .crawl(site, tracker)
                        .await
                        .map_err(|err| DiscoveryError::site_unreachable(site, err))?;
                    pages.extend(outcome.pages);
                    crawl_state = Some(outcome.state);
                    blocked_by_robots = outcome.blocked_by_robots;
                    failed_pages = outcome.failed_pages;
                    remaining_queue = outcome.remaining_queue;
                    if failed_pages > 0 {
                        warnings.push(format!(
                            "{failed_pages} pages on {site} failed to fetch and were \
                             skipped (e.g. {})",
                            outcome.failed_samples.join(", ")
                        ));
                    }

                    phase = if self.method == DiscoveryMethod::Crawl
                        && pages.len() < self.fallback_threshold
                    {
                        info!(
                            site = %site,
                            crawl_pages = pages.len(),
                            threshold = self.fallback_threshold,
                            "crawl too thin; trying the sitemap"
                        );
                        Phase::SitemapFallback
                    } else {
                        Phase::Done
                    };
                }
                Phase::SitemapFallback => {
                    tracker.set_phase(ProgressPhase::Sitemap, pages.len(), 0);
                    let outcome = self.scanner.discover(site, policy.sitemap_urls()).await;
                    warnings.extend(outcome.warnings);
                    let crawled = pages.len();
                    let message = if outcome.pages.len() > crawled {
                        pages = outcome.pages;
                        method_used = MethodUsed::CrawlWithSitemapFallback;
                        format!(
                            "crawl reached only {crawled} pages (threshold {}); \
                             using the {}-page sitemap result instead",
                            self.fallback_threshold,
                            pages.len()
                        )
                    } else {
                        format!(
                            "crawl reached only {crawled} pages (threshold {}) \
                             and the sitemap offered no more",
                            self.fallback_threshold
                        )
                    };
                    warn!("{message}");
                    warnings.push(message);
                    phase = Phase::Done;
                }
                Phase::Done => break,
            }
        }

        tracker.finish(pages.len());
        info!(
            site = %site,
            pages = pages.len(),
            method = %method_used,
            "site discovery finished"
        );
        Ok(DiscoveredSite {
            site: site.clone(),
            pages,
            method_used,
            crawl_state,
            blocked_by_robots,
            failed_pages,
            remaining_queue,
            warnings,
        })
    }
}
