//! End-to-end discovery and comparison tests against mock servers.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use sitediff_core::{
    CrawlConfig, CrawlState, DiscoveryEngine, DiscoveryError, DiscoveryMethod, ProgressTracker,
    Verifier,
};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn engine(config: CrawlConfig, discovery: DiscoveryMethod, threshold: usize) -> DiscoveryEngine {
    DiscoveryEngine::new(config, discovery, threshold, Arc::new(AtomicBool::new(false)))
        .expect("engine builds")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_sitemap(server: &MockServer, locs: &[&str]) {
    let entries: String = locs
        .iter()
        .map(|l| format!("<url><loc>{}{l}</loc></url>", server.uri()))
        .collect();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0"?><urlset>{entries}</urlset>"#
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_comparison_end_to_end() {
    let old = MockServer::start().await;
    let new = MockServer::start().await;

    mount_page(
        &old,
        "/",
        r#"<a href="/about">about</a><a href="/blog">blog</a>"#,
    )
    .await;
    mount_page(&old, "/about", "<p>about us</p>").await;
    mount_page(&old, "/blog", "<p>posts</p>").await;

    mount_page(
        &new,
        "/",
        r#"<a href="/about">about</a><a href="/contact">contact</a>"#,
    )
    .await;
    mount_page(&new, "/about", "<p>about us</p>").await;
    mount_page(&new, "/contact", "<p>say hi</p>").await;

    let engine = engine(CrawlConfig::default(), DiscoveryMethod::Crawl, 0);
    let old_url = Url::parse(&old.uri()).unwrap();
    let new_url = Url::parse(&new.uri()).unwrap();
    let (mut old_tracker, _orx) = ProgressTracker::new(old.uri(), 0);
    let (mut new_tracker, _nrx) = ProgressTracker::new(new.uri(), 0);

    let run = engine
        .run(&old_url, &new_url, &mut old_tracker, &mut new_tracker)
        .await
        .unwrap();

    assert_eq!(run.old.pages.len(), 3);
    assert_eq!(run.comparison.missing, vec!["/blog"]);
    assert_eq!(run.comparison.added, vec!["/contact"]);
    assert_eq!(run.old.crawl_state, Some(CrawlState::Completed));
    let pct = run.comparison.match_percentage();
    assert!((pct - 66.666).abs() < 0.01, "got {pct}");
}

#[tokio::test]
async fn test_sitemap_index_comparison_end_to_end() {
    let old = MockServer::start().await;
    let new = MockServer::start().await;

    // The old site publishes an index of two child sitemaps.
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<sitemapindex><sitemap><loc>{0}/posts.xml</loc></sitemap>\
             <sitemap><loc>{0}/pages.xml</loc></sitemap></sitemapindex>",
            old.uri()
        )))
        .mount(&old)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{0}/post-1</loc></url><url><loc>{0}/post-2</loc></url></urlset>",
            old.uri()
        )))
        .mount(&old)
        .await;
    Mock::given(method("GET"))
        .and(path("/pages.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{}/landing</loc></url></urlset>",
            old.uri()
        )))
        .mount(&old)
        .await;

    mount_sitemap(&new, &["/post-1", "/landing"]).await;

    let engine = engine(CrawlConfig::default(), DiscoveryMethod::Sitemap, 0);
    let old_url = Url::parse(&old.uri()).unwrap();
    let new_url = Url::parse(&new.uri()).unwrap();
    let (mut old_tracker, _orx) = ProgressTracker::new(old.uri(), 0);
    let (mut new_tracker, _nrx) = ProgressTracker::new(new.uri(), 0);

    let run = engine
        .run(&old_url, &new_url, &mut old_tracker, &mut new_tracker)
        .await
        .unwrap();

    assert_eq!(
        run.old.pages.iter().cloned().collect::<Vec<_>>(),
        vec!["/landing", "/post-1", "/post-2"]
    );
    assert_eq!(run.comparison.missing, vec!["/post-2"]);
    assert!(run.comparison.added.is_empty());
}

#[tokio::test]
async fn test_page_cap_marks_results_partial() {
    let server = MockServer::start().await;
    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/pg{i}">p</a>"#))
        .collect();
    mount_page(&server, "/", &links).await;
    for i in 0..20 {
        mount_page(&server, &format!("/pg{i}"), "<p>leaf</p>").await;
    }

    let config = CrawlConfig {
        max_pages: 3,
        ..CrawlConfig::default()
    };
    let engine = engine(config, DiscoveryMethod::Crawl, 0);
    let site = Url::parse(&server.uri()).unwrap();
    let (mut tracker, _rx) = ProgressTracker::new(server.uri(), 0);

    let discovered = engine.discover_site(&site, &mut tracker).await.unwrap();
    assert_eq!(discovered.crawl_state, Some(CrawlState::LimitReached));
    assert_eq!(discovered.pages.len(), 3);
    assert!(discovered.remaining_queue > 0);
}

#[tokio::test]
async fn test_unreachable_old_site_fails_run() {
    let new = MockServer::start().await;
    mount_page(&new, "/", "<p>alive</p>").await;

    let engine = engine(CrawlConfig::default(), DiscoveryMethod::Crawl, 0);
    let old_url = Url::parse("http://127.0.0.1:1/").unwrap();
    let new_url = Url::parse(&new.uri()).unwrap();
    let (mut old_tracker, _orx) = ProgressTracker::new("http://127.0.0.1:1", 0);
    let (mut new_tracker, _nrx) = ProgressTracker::new(new.uri(), 0);

    let err = engine
        .run(&old_url, &new_url, &mut old_tracker, &mut new_tracker)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::SiteUnreachable { .. }));
}

#[tokio::test]
async fn test_differences_survive_verification() {
    let old = MockServer::start().await;
    let new = MockServer::start().await;

    mount_sitemap(&old, &["/kept-page", "/dropped-page", "/undiscovered"]).await;
    mount_sitemap(&new, &["/kept-page"]).await;
    // "/undiscovered" is live on the new site; the sitemap just omits it.
    Mock::given(method("HEAD"))
        .and(path("/undiscovered"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&new)
        .await;

    let engine = engine(CrawlConfig::default(), DiscoveryMethod::Sitemap, 0);
    let old_url = Url::parse(&old.uri()).unwrap();
    let new_url = Url::parse(&new.uri()).unwrap();
    let (mut old_tracker, _orx) = ProgressTracker::new(old.uri(), 0);
    let (mut new_tracker, _nrx) = ProgressTracker::new(new.uri(), 0);

    let run = engine
        .run(&old_url, &new_url, &mut old_tracker, &mut new_tracker)
        .await
        .unwrap();
    assert_eq!(run.comparison.missing.len(), 2);

    let verifier = Verifier::new(reqwest::Client::new(), Duration::from_secs(5), 50);
    let report = verifier.verify(&run.comparison, &old_url, &new_url).await;
    assert_eq!(report.confirmed_missing, vec!["/dropped-page"]);
    assert_eq!(report.false_missing, vec!["/undiscovered"]);
}
