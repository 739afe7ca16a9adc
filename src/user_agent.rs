//! Default User-Agent string for all outgoing HTTP traffic.
//!
//! Single source for project URL and UA format so crawl, robots, and sitemap
//! requests identify themselves consistently (good citizenship; RFC 9308).

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/sitediff";

/// Default User-Agent announced on every request unless overridden.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("sitediff/{version} (site-comparison-tool; +{PROJECT_UA_URL})")
}
