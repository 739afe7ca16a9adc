//! Link extraction from fetched HTML.
//!
//! Extraction is fully synchronous: `scraper::Html` holds `Rc` internals and
//! is not `Send`, so the parsed document must never live across an await.
//! The crawl engine calls this between batches, after the fetch futures have
//! resolved.
//!
//! Beyond plain anchors, pages built by JS frameworks hide their navigation
//! in JSON-LD blobs, `data-href` attributes, and route tables inside inline
//! scripts; those sources are mined too. On the homepage, or when a page
//! yields suspiciously few links, an aggressive regex sweep over the raw
//! HTML picks up URL-shaped string literals the structured passes missed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::url::{NormalizedUrl, UrlFilters, canonicalize};

/// A page with fewer anchors than this triggers the aggressive sweep.
const SPARSE_LINK_THRESHOLD: usize = 10;

/// Aggressive-sweep candidates shorter than this are dropped; they are
/// almost always false positives like "/api" or "en".
const MIN_AGGRESSIVE_LEN: usize = 10;

/// Quoted values of url-ish keys in inline scripts: `path: "/x"`,
/// `"url": "/y"`, `href = '/z'`.
#[allow(clippy::expect_used)]
static SCRIPT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?(?i:href|url|path)["']?\s*[:=]\s*["']([^"']+)["']"#)
        .expect("static regex is valid")
});

/// URL-shaped quoted literals anywhere in the document.
#[allow(clippy::expect_used)]
static AGGRESSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](https?://[^"'\s<>]+|/[A-Za-z0-9][A-Za-z0-9_\-./]*)["']"#)
        .expect("static regex is valid")
});

/// Result of one page's link extraction.
#[derive(Debug, Default)]
pub struct Extraction {
    /// In-scope links, deduped by path, in discovery order.
    pub links: Vec<NormalizedUrl>,
    /// Candidates dropped by canonicalization (cross-host, assets, etc.).
    pub rejected: usize,
}

/// Extracts crawlable links from `html`, resolved against `base`.
///
/// `force_aggressive` runs the raw-literal sweep unconditionally (used for
/// the homepage); otherwise it only runs when the structured passes found
/// fewer than [`SPARSE_LINK_THRESHOLD`] links.
#[must_use]
#[allow(clippy::expect_used)]
pub fn extract_links(
    html: &str,
    base: &Url,
    filters: &UrlFilters,
    force_aggressive: bool,
) -> Extraction {
    // Static selectors, known valid.
    let anchor_sel = Selector::parse("a[href]").expect("valid selector");
    let canonical_sel = Selector::parse(r#"link[rel="canonical"]"#).expect("valid selector");
    let data_href_sel = Selector::parse("[data-href]").expect("valid selector");
    let jsonld_sel =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector");
    let script_sel = Selector::parse("script").expect("valid selector");

    let mut candidates: Vec<String> = Vec::new();
    let doc = Html::parse_document(html);

    for el in doc.select(&anchor_sel) {
        if let Some(href) = el.value().attr("href") {
            candidates.push(href.to_string());
        }
    }
    for el in doc.select(&canonical_sel) {
        if let Some(href) = el.value().attr("href") {
            candidates.push(href.to_string());
        }
    }
    for el in doc.select(&data_href_sel) {
        if let Some(href) = el.value().attr("data-href") {
            candidates.push(href.to_string());
        }
    }
    for el in doc.select(&jsonld_sel) {
        let text: String = el.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            collect_jsonld_urls(&value, &mut candidates);
        }
    }
    for el in doc.select(&script_sel) {
        if el.value().attr("type") == Some("application/ld+json") {
            continue;
        }
        let text: String = el.text().collect();
        for caps in SCRIPT_KEY_RE.captures_iter(&text) {
            if let Some(m) = caps.get(1) {
                candidates.push(m.as_str().to_string());
            }
        }
    }

    let mut extraction = Extraction::default();
    let mut seen_paths: HashSet<String> = HashSet::new();
    absorb(&candidates, base, filters, &mut seen_paths, &mut extraction);

    if force_aggressive || extraction.links.len() < SPARSE_LINK_THRESHOLD {
        let swept: Vec<String> = AGGRESSIVE_RE
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| s.len() >= MIN_AGGRESSIVE_LEN)
            .collect();
        absorb(&swept, base, filters, &mut seen_paths, &mut extraction);
    }

    extraction
}

fn absorb(
    candidates: &[String],
    base: &Url,
    filters: &UrlFilters,
    seen_paths: &mut HashSet<String>,
    extraction: &mut Extraction,
) {
    for raw in candidates {
        match canonicalize(raw, base, filters) {
            Ok(url) => {
                if seen_paths.insert(url.comparison_key().to_string()) {
                    extraction.links.push(url);
                }
            }
            Err(_) => extraction.rejected += 1,
        }
    }
}

/// Walks a JSON-LD value collecting link-bearing fields.
fn collect_jsonld_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if matches!(key.as_str(), "url" | "mainEntityOfPage" | "sameAs") {
                    push_url_values(inner, out);
                }
                collect_jsonld_urls(inner, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_jsonld_urls(item, out);
            }
        }
        _ => {}
    }
}

fn push_url_values(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                if let Value::String(s) = item {
                    out.push(s.clone());
                }
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("@id") {
                out.push(id.clone());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn paths(extraction: &Extraction) -> Vec<&str> {
        extraction.links.iter().map(|u| u.path.as_str()).collect()
    }

    // ==================== Structured sources ====================

    #[test]
    fn test_extract_anchors() {
        let html = r#"<a href="/about">About</a> <a href="/contact/">Contact</a>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        assert_eq!(paths(&extraction), vec!["/about", "/contact"]);
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<head><link rel="canonical" href="https://example.com/real-page-name"></head>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        assert!(paths(&extraction).contains(&"/real-page-name"));
    }

    #[test]
    fn test_extract_data_href() {
        let html = r#"<div data-href="/clickable-card-target">card</div>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        assert!(paths(&extraction).contains(&"/clickable-card-target"));
    }

    #[test]
    fn test_extract_jsonld() {
        let html = r#"<script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Article",
             "url": "https://example.com/articles/one",
             "mainEntityOfPage": {"@id": "https://example.com/articles/one-main"},
             "sameAs": ["https://example.com/articles/canonical-one"]}
        </script>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        let found = paths(&extraction);
        assert!(found.contains(&"/articles/one"));
        assert!(found.contains(&"/articles/one-main"));
        assert!(found.contains(&"/articles/canonical-one"));
    }

    #[test]
    fn test_extract_script_route_literals() {
        let html = r#"<script>
            var routes = [{path: "/app/dashboard-view"}, {"url": "/app/settings-view"}];
            var next = 'ignored';
        </script>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        let found = paths(&extraction);
        assert!(found.contains(&"/app/dashboard-view"));
        assert!(found.contains(&"/app/settings-view"));
    }

    // ==================== Scoping and dedup ====================

    #[test]
    fn test_cross_host_and_assets_are_rejected_not_linked() {
        let html = r#"
            <a href="https://other.example/page">external</a>
            <a href="/logo.png">asset</a>
            <a href="mailto:x@example.com">mail</a>
            <a href="/kept-page-link">ok</a>
        "#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        assert_eq!(paths(&extraction), vec!["/kept-page-link"]);
        // The sparse-page sweep also runs here and re-rejects the external
        // URL, so the count is a floor rather than an exact figure.
        assert!(extraction.rejected >= 3);
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let html = r#"<a href="/x-duplicated">a</a><a href="/x-duplicated/">b</a>
                      <a href="https://www.example.com/x-duplicated">c</a>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        assert_eq!(paths(&extraction), vec!["/x-duplicated"]);
    }

    // ==================== Aggressive sweep ====================

    #[test]
    fn test_aggressive_sweep_on_sparse_pages() {
        // No anchors at all, so the sweep kicks in and finds the literal.
        let html = r#"<div id="app" data-config='{"page":"/hidden/spa-route-page"}'></div>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), false);
        assert!(paths(&extraction).contains(&"/hidden/spa-route-page"));
    }

    #[test]
    fn test_aggressive_sweep_drops_short_candidates() {
        let html = r#"<div data-x="'/api'"></div>"#;
        let extraction = extract_links(html, &base(), &UrlFilters::default(), true);
        assert!(extraction.links.is_empty());
    }

    #[test]
    fn test_no_sweep_when_page_is_link_rich() {
        let mut html = String::new();
        for i in 0..12 {
            html.push_str(&format!(r#"<a href="/page-number-{i}">p</a>"#));
        }
        html.push_str(r#"<span>"/stray/quoted-literal-path"</span>"#);
        let extraction = extract_links(&html, &base(), &UrlFilters::default(), false);
        assert!(!paths(&extraction).contains(&"/stray/quoted-literal-path"));
    }

    #[test]
    fn test_forced_sweep_on_link_rich_page() {
        let mut html = String::new();
        for i in 0..12 {
            html.push_str(&format!(r#"<a href="/page-number-{i}">p</a>"#));
        }
        html.push_str(r#"<span>"/stray/quoted-literal-path"</span>"#);
        let extraction = extract_links(&html, &base(), &UrlFilters::default(), true);
        assert!(paths(&extraction).contains(&"/stray/quoted-literal-path"));
    }
}
