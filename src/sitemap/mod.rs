//! Sitemap discovery and expansion.
//!
//! Locates a site's sitemap (robots.txt directives first, then the
//! conventional filenames), expands sitemap indexes recursively, and reduces
//! every `<loc>` entry to a canonical path. Parsing is deliberately lenient:
//! real-world sitemaps are full of namespace quirks and truncated XML, so the
//! entries are pulled out with an HTML-tolerant parser instead of a strict
//! XML one.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::url::UrlFilters;

/// Paths probed when robots.txt lists no sitemap, in order.
const CONVENTIONAL_LOCATIONS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/sitemaps/sitemap.xml",
    "/sitemap/sitemap.xml",
    "/sitemap1.xml",
    "/post-sitemap.xml",
    "/page-sitemap.xml",
    "/wp-sitemap.xml",
];

/// Timeout for the top-level sitemap request. Generous because index files
/// on large sites can run to megabytes.
const ROOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for nested sitemap requests.
const NESTED_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum index nesting depth before expansion stops.
const MAX_DEPTH: usize = 3;

/// Result of one site's sitemap discovery.
#[derive(Debug, Default)]
pub struct SitemapOutcome {
    /// Canonical paths extracted from all reachable sitemaps.
    pub pages: BTreeSet<String>,
    /// Sitemap documents fetched, including failed attempts.
    pub sitemaps_fetched: usize,
    /// Non-fatal problems worth surfacing in the final report.
    pub warnings: Vec<String>,
}

/// Discovers pages from a site's sitemaps.
pub struct SitemapScanner {
    client: reqwest::Client,
    filters: std::sync::Arc<UrlFilters>,
}

impl SitemapScanner {
    #[must_use]
    pub fn new(client: reqwest::Client, filters: std::sync::Arc<UrlFilters>) -> Self {
        Self { client, filters }
    }

    /// Runs sitemap discovery for `site`.
    ///
    /// Sitemaps listed in robots.txt are tried first; only if none of them
    /// yields a page are the conventional locations probed, stopping at the
    /// first one that produces pages.
    #[instrument(skip(self, robots_sitemaps), fields(site = %site))]
    pub async fn discover(&self, site: &Url, robots_sitemaps: &[String]) -> SitemapOutcome {
        let mut outcome = SitemapOutcome::default();

        for listed in robots_sitemaps {
            let rooted = reroot(listed, site);
            self.expand_tree(&rooted, site, true, &mut outcome).await;
        }

        if outcome.pages.is_empty() {
            for location in CONVENTIONAL_LOCATIONS {
                let candidate = format!("{}{location}", crate::url::origin(site));
                self.expand_tree(&candidate, site, false, &mut outcome).await;
                if !outcome.pages.is_empty() {
                    break;
                }
            }
        }

        info!(
            site = %site,
            pages = outcome.pages.len(),
            sitemaps = outcome.sitemaps_fetched,
            "sitemap discovery finished"
        );
        outcome
    }

    /// Expands one sitemap tree breadth-first, following index entries up to
    /// [`MAX_DEPTH`] and skipping anything already visited (cycle guard).
    ///
    /// A failed root fetch is only a warning when the root was explicitly
    /// listed in robots.txt; probing a conventional location that does not
    /// exist is expected and stays at debug level.
    async fn expand_tree(
        &self,
        root_url: &str,
        site: &Url,
        listed: bool,
        outcome: &mut SitemapOutcome,
    ) {
        let mut queue = VecDeque::from([(root_url.to_string(), 0usize)]);
        let mut visited: HashSet<String> = HashSet::new();

        while let Some((url, depth)) = queue.pop_front() {
            if !visited.insert(url.clone()) {
                continue;
            }
            let timeout = if depth == 0 { ROOT_TIMEOUT } else { NESTED_TIMEOUT };
            outcome.sitemaps_fetched += 1;

            let body = match self.fetch(&url, timeout).await {
                Ok(body) => body,
                Err(reason) => {
                    if depth > 0 {
                        let message = format!("nested sitemap {url} skipped: {reason}");
                        warn!("{message}");
                        outcome.warnings.push(message);
                    } else if listed {
                        let message =
                            format!("sitemap {url} listed in robots.txt is unreachable: {reason}");
                        warn!("{message}");
                        outcome.warnings.push(message);
                    } else {
                        debug!(url = %url, reason = %reason, "no sitemap at conventional location");
                    }
                    continue;
                }
            };

            let parsed = parse_sitemap(&body);
            debug!(
                url = %url,
                depth,
                children = parsed.children.len(),
                entries = parsed.pages.len(),
                "parsed sitemap"
            );

            for child in parsed.children {
                let rooted = reroot(&child, site);
                if depth + 1 > MAX_DEPTH {
                    let message =
                        format!("sitemap nesting deeper than {MAX_DEPTH} levels; skipping {rooted}");
                    warn!("{message}");
                    outcome.warnings.push(message);
                    continue;
                }
                queue.push_back((rooted, depth + 1));
            }

            for loc in parsed.pages {
                let rooted = reroot(&loc, site);
                if let Ok(normalized) = crate::url::canonicalize(&rooted, site, &self.filters) {
                    outcome.pages.insert(normalized.path);
                }
            }
        }
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status.as_u16()));
        }
        response.text().await.map_err(|err| err.to_string())
    }
}

struct ParsedSitemap {
    /// Child sitemap URLs (`<sitemap><loc>` entries of an index file).
    children: Vec<String>,
    /// Page URLs (`<url><loc>` entries, or bare `<loc>` as a fallback).
    pages: Vec<String>,
}

/// Pulls `<loc>` entries out of sitemap XML, tolerating malformed markup.
#[allow(clippy::expect_used)]
fn parse_sitemap(body: &str) -> ParsedSitemap {
    // These selectors are static and known-valid.
    let child_sel = Selector::parse("sitemap loc").expect("valid selector");
    let page_sel = Selector::parse("url loc").expect("valid selector");
    let any_loc_sel = Selector::parse("loc").expect("valid selector");

    let doc = Html::parse_document(body);
    let text_of = |el: scraper::ElementRef<'_>| el.text().collect::<String>().trim().to_string();

    let children: Vec<String> = doc
        .select(&child_sel)
        .map(text_of)
        .filter(|s| !s.is_empty())
        .collect();
    let mut pages: Vec<String> = doc
        .select(&page_sel)
        .map(text_of)
        .filter(|s| !s.is_empty())
        .collect();

    // Some generators emit bare <loc> lists without <url> wrappers.
    if children.is_empty() && pages.is_empty() {
        pages = doc
            .select(&any_loc_sel)
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect();
    }

    ParsedSitemap { children, pages }
}

/// Rewrites `loc` onto `site`'s origin when its host differs.
///
/// Staging and migrated sites routinely serve sitemaps whose entries still
/// point at the production domain; the paths are what matter here.
fn reroot(loc: &str, site: &Url) -> String {
    let trimmed = loc.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    let loc_host = parsed.host_str().unwrap_or_default().to_lowercase();
    let site_host = site.host_str().unwrap_or_default().to_lowercase();
    if crate::url::same_site(&loc_host, &site_host) {
        return trimmed.to_string();
    }
    let mut rebuilt = format!("{}{}", crate::url::origin(site), parsed.path());
    if let Some(query) = parsed.query() {
        rebuilt.push('?');
        rebuilt.push_str(query);
    }
    rebuilt
}
