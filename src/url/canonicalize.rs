//! URL normalization and path-based identity.

use url::Url;

use super::filters::UrlFilters;

/// Maximum URL length accepted by the canonicalizer (2000 chars).
pub const MAX_URL_LENGTH: usize = 2000;

/// Prefixes that can never resolve to a crawlable page.
const SKIP_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

/// A URL reduced to its canonical form.
///
/// Invariants:
/// - `path` has no trailing slash (except the root `/`), no query string,
///   no fragment, and no backslash characters
/// - `scheme` and `host` are lowercase; path case is preserved
///   (paths can be case-sensitive)
///
/// Two URLs are equal-for-comparison iff their `path` values match; scheme
/// and host are deliberately ignored so the same page can be matched across
/// two different domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// Lowercase scheme (`http` or `https`).
    pub scheme: String,
    /// Lowercase host, including port when non-default.
    pub host: String,
    /// Canonical path (leading `/`, no trailing slash except root).
    pub path: String,
    /// The raw string this URL was canonicalized from.
    pub original: String,
}

impl NormalizedUrl {
    /// Returns the identity used for frontier dedup and final comparison.
    ///
    /// Domain and scheme are intentionally excluded: the whole point of the
    /// comparison is matching pages across two different hosts.
    #[must_use]
    pub fn comparison_key(&self) -> &str {
        &self.path
    }

    /// Returns true when `self` and `other` identify the same page
    /// (path equality, domain/scheme-invariant).
    #[must_use]
    pub fn equals_for_comparison(&self, other: &NormalizedUrl) -> bool {
        self.path == other.path
    }

    /// Reassembles the full URL string (scheme + host + canonical path).
    #[must_use]
    pub fn as_full_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)
    }
}

/// Why a raw URL did not produce a [`NormalizedUrl`].
///
/// Rejection is expected noise, not an error: most pages link to assets,
/// external sites, and `javascript:` handlers, and all of those land here.
/// Callers count or ignore rejects; they never propagate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// Scheme is not http/https, or the input is a skip-prefix href.
    Scheme,
    /// Host differs from the crawl's target host (www is transparent).
    CrossHost,
    /// Path matched the exclusion filter set.
    Excluded,
    /// Empty, over-long, or not parseable as a URL at all.
    Unparseable,
}

/// Canonicalizes a raw URL against a base, scoped to the base's host.
///
/// Normalization rules:
/// - backslashes are stripped from the raw string before any parsing
/// - relative inputs resolve against `base`
/// - query string and fragment are dropped
/// - scheme and host are lowercased; a single trailing slash is removed
///   unless the path is exactly `/`
///
/// Rejects (see [`Reject`]) when the scheme is not http/https, the host is
/// not the base's host (`www.` is transparent on both sides), or the path
/// matches `filters`.
pub fn canonicalize(raw: &str, base: &Url, filters: &UrlFilters) -> Result<NormalizedUrl, Reject> {
    // Backslash-corrupted hrefs must never reach the URL parser.
    let cleaned = raw.replace('\\', "");
    let cleaned = cleaned.trim().trim_matches(|c| c == '"' || c == '\'');

    if cleaned.is_empty() || cleaned.len() > MAX_URL_LENGTH {
        return Err(Reject::Unparseable);
    }
    if SKIP_PREFIXES.iter().any(|p| cleaned.starts_with(p)) {
        return Err(Reject::Scheme);
    }

    let parsed = base.join(cleaned).map_err(|_| Reject::Unparseable)?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(Reject::Scheme),
    }

    let host = parsed.host_str().ok_or(Reject::Unparseable)?.to_lowercase();
    let base_host = base.host_str().ok_or(Reject::Unparseable)?.to_lowercase();
    if !same_site(&host, &base_host) {
        return Err(Reject::CrossHost);
    }

    let path = normalize_path(parsed.path());
    if filters.is_excluded(&path) {
        return Err(Reject::Excluded);
    }

    let host_with_port = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };

    Ok(NormalizedUrl {
        scheme: parsed.scheme().to_lowercase(),
        host: host_with_port,
        path,
        original: raw.to_string(),
    })
}

/// Normalizes a URL path: strip query/fragment leftovers, drop the trailing
/// slash except for root, ensure a leading slash.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Origin string (`scheme://host[:port]`) of a parsed URL.
pub(crate) fn origin(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{port}"));
    }
    origin
}

/// Compares two hosts treating `www.` as transparent.
///
/// Sites routinely serve the same pages from `a.com` and `www.a.com`, and
/// sitemaps often reference the other variant; both count as the same site.
pub(crate) fn same_site(a: &str, b: &str) -> bool {
    strip_www(a) == strip_www(b)
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
