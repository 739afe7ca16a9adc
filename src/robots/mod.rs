//! robots.txt fetching, parsing, and path matching.
//!
//! Policies are cached per origin with a short TTL so the two crawls of a
//! comparison run share one fetch per site. Any failure to fetch or parse
//! yields a permissive policy; robots handling must never abort discovery.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};
use url::Url;

/// How long a fetched policy stays valid before it is re-fetched.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Dedicated timeout for the robots.txt request itself.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// User-agent token matched against `User-agent:` group headers.
const UA_TOKEN: &str = "sitediff";

/// A single Allow or Disallow line from an applicable group.
#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    pattern: String,
}

/// Parsed robots.txt directives relevant to this tool.
#[derive(Debug, Default)]
pub struct RobotsPolicy {
    rules: Vec<Rule>,
    sitemaps: Vec<String>,
}

impl RobotsPolicy {
    /// A policy that allows every path and lists no sitemaps. Used whenever
    /// robots.txt is missing, unreachable, or unreadable.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Parses robots.txt text. Rules are taken from groups naming this tool
    /// specifically when any exist, otherwise from `User-agent: *` groups.
    /// `Sitemap:` directives are collected from anywhere in the file.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut wildcard_rules = Vec::new();
        let mut specific_rules = Vec::new();
        let mut sitemaps = Vec::new();

        // Which buckets the current group's rules land in. Consecutive
        // User-agent lines extend the same group until a rule is seen.
        let mut group_wildcard = false;
        let mut group_specific = false;
        let mut in_ua_header = false;

        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    if !in_ua_header {
                        group_wildcard = false;
                        group_specific = false;
                        in_ua_header = true;
                    }
                    if value == "*" {
                        group_wildcard = true;
                    } else if value.to_lowercase().contains(UA_TOKEN) {
                        group_specific = true;
                    }
                }
                "allow" | "disallow" => {
                    in_ua_header = false;
                    if value.is_empty() {
                        continue;
                    }
                    let rule = Rule {
                        allow: field == "allow",
                        pattern: value.to_string(),
                    };
                    if group_specific {
                        specific_rules.push(rule.clone());
                    }
                    if group_wildcard {
                        wildcard_rules.push(rule);
                    }
                }
                "sitemap" => {
                    in_ua_header = false;
                    if !value.is_empty() {
                        sitemaps.push(value.to_string());
                    }
                }
                _ => in_ua_header = false,
            }
        }

        let rules = if specific_rules.is_empty() {
            wildcard_rules
        } else {
            specific_rules
        };
        Self { rules, sitemaps }
    }

    /// Whether `path` may be fetched. The most specific matching rule wins
    /// (longest pattern); on a tie, Allow wins.
    #[must_use]
    pub fn is_allowed(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if !pattern_matches(&rule.pattern, path) {
                continue;
            }
            let len = rule.pattern.len();
            match best {
                Some((best_len, best_allow)) => {
                    if len > best_len || (len == best_len && rule.allow && !best_allow) {
                        best = Some((len, rule.allow));
                    }
                }
                None => best = Some((len, rule.allow)),
            }
        }
        best.is_none_or(|(_, allow)| allow)
    }

    /// Whether the site root itself is disallowed, which makes crawling
    /// pointless for this user agent.
    #[must_use]
    pub fn fully_blocks(&self) -> bool {
        !self.is_allowed("/")
    }

    /// Sitemap URLs declared in the file, in order of appearance.
    #[must_use]
    pub fn sitemap_urls(&self) -> &[String] {
        &self.sitemaps
    }
}

/// Matches a robots.txt pattern against a path. `*` matches any run of
/// characters and a trailing `$` anchors the match to the end of the path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return true;
    };
    if !path.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    for part in parts {
        if part.is_empty() {
            // Consecutive or trailing '*': matches the empty run here.
            continue;
        }
        match path[pos..].find(part) {
            Some(offset) => pos += offset + part.len(),
            None => return false,
        }
    }
    if anchored && !pattern.ends_with('*') {
        pos == path.len()
    } else {
        true
    }
}

struct CachedPolicy {
    policy: Arc<RobotsPolicy>,
    fetched_at: Instant,
}

/// Fetches and caches robots.txt policies per origin.
///
/// With `ignore` set, path checks always pass but policies are still fetched
/// so their `Sitemap:` directives remain available to sitemap discovery.
pub struct RobotsResolver {
    client: reqwest::Client,
    ignore: bool,
    cache: DashMap<String, CachedPolicy>,
}

impl RobotsResolver {
    #[must_use]
    pub fn new(client: reqwest::Client, ignore: bool) -> Self {
        Self {
            client,
            ignore,
            cache: DashMap::new(),
        }
    }

    /// Whether `Disallow:` directives are being ignored for this run.
    #[must_use]
    pub fn ignores_directives(&self) -> bool {
        self.ignore
    }

    /// Whether `path` may be fetched under `policy` for this run.
    #[must_use]
    pub fn is_allowed(&self, policy: &RobotsPolicy, path: &str) -> bool {
        self.ignore || policy.is_allowed(path)
    }

    /// Returns the policy for `site`'s origin, fetching it at most once per
    /// TTL window.
    pub async fn policy_for(&self, site: &Url) -> Arc<RobotsPolicy> {
        let origin = crate::url::origin(site);
        if let Some(cached) = self.cache.get(&origin) {
            if cached.fetched_at.elapsed() < CACHE_TTL {
                return Arc::clone(&cached.policy);
            }
        }
        let policy = Arc::new(self.fetch(&origin).await);
        self.cache.insert(
            origin,
            CachedPolicy {
                policy: Arc::clone(&policy),
                fetched_at: Instant::now(),
            },
        );
        policy
    }

    async fn fetch(&self, origin: &str) -> RobotsPolicy {
        let robots_url = format!("{origin}/robots.txt");
        let response = self
            .client
            .get(&robots_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => {
                    debug!(url = %robots_url, bytes = body.len(), "parsed robots.txt");
                    RobotsPolicy::parse(&body)
                }
                Err(err) => {
                    warn!(url = %robots_url, error = %err, "failed to read robots.txt body; treating as permissive");
                    RobotsPolicy::permissive()
                }
            },
            Ok(resp) => {
                debug!(url = %robots_url, status = resp.status().as_u16(), "no usable robots.txt; treating as permissive");
                RobotsPolicy::permissive()
            }
            Err(err) => {
                warn!(url = %robots_url, error = %err, "failed to fetch robots.txt; treating as permissive");
                RobotsPolicy::permissive()
            }
        }
    }
}

/// Tracks URLs skipped because robots.txt disallowed them. The first few are
/// logged individually; the rest only feed the end-of-crawl summary.
#[derive(Debug, Default)]
pub struct BlockedCounter {
    count: usize,
}

impl BlockedCounter {
    const LOG_LIMIT: usize = 3;

    /// Records one blocked URL.
    pub fn record(&mut self, url: &str) {
        if self.count < Self::LOG_LIMIT {
            debug!(url = %url, "skipped: disallowed by robots.txt");
        }
        self.count += 1;
    }

    /// Total URLs blocked so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Emits a single summary line if anything was blocked.
    pub fn log_summary(&self, site: &str) {
        if self.count > 0 {
            info!(
                site = %site,
                blocked = self.count,
                "urls skipped due to robots.txt"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ==================== Parsing ====================

    #[test]
    fn test_parse_wildcard_group() {
        let policy = RobotsPolicy::parse(
            "User-agent: *\nDisallow: /private/\nAllow: /private/ok\n",
        );
        assert!(!policy.is_allowed("/private/page"));
        assert!(policy.is_allowed("/private/ok"));
        assert!(policy.is_allowed("/public"));
    }

    #[test]
    fn test_specific_group_overrides_wildcard() {
        let policy = RobotsPolicy::parse(
            "User-agent: *\nDisallow: /\n\nUser-agent: sitediff\nDisallow: /admin/\n",
        );
        assert!(policy.is_allowed("/anything"));
        assert!(!policy.is_allowed("/admin/panel"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let policy = RobotsPolicy::parse(
            "# header comment\nUser-agent: * # inline\n\nDisallow: /x # trailing\n",
        );
        assert!(!policy.is_allowed("/x/y"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow:\n");
        assert!(policy.is_allowed("/anything"));
        assert!(!policy.fully_blocks());
    }

    #[test]
    fn test_sitemap_directives_collected_globally() {
        let policy = RobotsPolicy::parse(
            "Sitemap: https://a.example/sitemap.xml\nUser-agent: *\nDisallow: /x\nSitemap: https://a.example/other.xml\n",
        );
        assert_eq!(
            policy.sitemap_urls(),
            &[
                "https://a.example/sitemap.xml".to_string(),
                "https://a.example/other.xml".to_string()
            ]
        );
    }

    // ==================== Matching ====================

    #[test]
    fn test_wildcard_pattern() {
        assert!(pattern_matches("/a/*/c", "/a/b/c"));
        assert!(pattern_matches("/a/*/c", "/a/b/c/d"));
        assert!(!pattern_matches("/a/*/c", "/a/b/x"));
    }

    #[test]
    fn test_end_anchor() {
        assert!(pattern_matches("/page$", "/page"));
        assert!(!pattern_matches("/page$", "/pages"));
        assert!(pattern_matches("/*.pdf$", "/docs/file.pdf"));
        assert!(!pattern_matches("/*.pdf$", "/docs/file.pdf?x=1"));
    }

    #[test]
    fn test_anchor_after_trailing_wildcard_is_inert() {
        assert!(pattern_matches("/dir/*$", "/dir/anything"));
    }

    #[test]
    fn test_longest_match_wins_allow_breaks_ties() {
        let policy = RobotsPolicy::parse(
            "User-agent: *\nDisallow: /shop/\nAllow: /shop/sale/\n",
        );
        assert!(!policy.is_allowed("/shop/cart"));
        assert!(policy.is_allowed("/shop/sale/item"));

        let tie = RobotsPolicy::parse("User-agent: *\nDisallow: /p/\nAllow: /p/\n");
        assert!(tie.is_allowed("/p/x"));
    }

    #[test]
    fn test_fully_blocks() {
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /\n");
        assert!(policy.fully_blocks());
        assert!(!RobotsPolicy::permissive().fully_blocks());
    }

    // ==================== Resolver ====================

    #[tokio::test]
    async fn test_resolver_caches_per_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /hidden\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = RobotsResolver::new(reqwest::Client::new(), false);
        let site = Url::parse(&server.uri()).unwrap();
        let first = resolver.policy_for(&site).await;
        let second = resolver.policy_for(&site).await;
        assert!(!first.is_allowed("/hidden"));
        assert!(!second.is_allowed("/hidden"));
    }

    #[tokio::test]
    async fn test_resolver_missing_robots_is_permissive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = RobotsResolver::new(reqwest::Client::new(), false);
        let site = Url::parse(&server.uri()).unwrap();
        let policy = resolver.policy_for(&site).await;
        assert!(policy.is_allowed("/anything"));
    }

    #[tokio::test]
    async fn test_ignore_mode_allows_all_but_keeps_sitemaps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "User-agent: *\nDisallow: /\nSitemap: https://x.example/sitemap.xml\n",
            ))
            .mount(&server)
            .await;

        let resolver = RobotsResolver::new(reqwest::Client::new(), true);
        let site = Url::parse(&server.uri()).unwrap();
        let policy = resolver.policy_for(&site).await;
        assert!(resolver.is_allowed(&policy, "/blocked"));
        assert_eq!(policy.sitemap_urls().len(), 1);
    }

    // ==================== Blocked counter ====================

    #[test]
    fn test_blocked_counter_counts() {
        let mut counter = BlockedCounter::default();
        for i in 0..5 {
            counter.record(&format!("/blocked/{i}"));
        }
        assert_eq!(counter.count(), 5);
    }
}
