//! HTTP client wrapper for fetching HTML pages.
//!
//! Provides the [`PageFetcher`] trait the crawler consumes and the
//! reqwest-backed [`HttpFetcher`] the binary ships. A JavaScript-rendering
//! backend would implement the same trait; the crawler treats the returned
//! HTML as an opaque source of links either way.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};

use super::error::FetchError;
use crate::user_agent;

/// Maximum redirects followed per request.
const REDIRECT_LIMIT: usize = 10;

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status of the final response.
    pub status: u16,
    /// URL of the final response after redirects; links resolve against
    /// this, not the requested URL.
    pub final_url: String,
    /// Response body.
    pub html: String,
}

/// Capability to fetch a page's HTML.
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn PageFetcher>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required here.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page at `url` and returns its HTML.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on timeout, network failure, error status, or
    /// non-HTML content. Failures never escape as panics; the crawler's
    /// per-page handling recovers from all of them.
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed [`PageFetcher`] with timeout, redirect, and auth support.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    auth: Option<(String, String)>,
}

impl HttpFetcher {
    /// Creates a fetcher with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when a custom header name/value
    /// does not parse, and a network-variant error if the client fails to
    /// build.
    pub fn new(
        timeout: Duration,
        custom_headers: &[(String, String)],
        auth: Option<(String, String)>,
        user_agent_override: Option<&str>,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in custom_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| FetchError::invalid_url(name.clone(), e.to_string()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| FetchError::invalid_url(value.clone(), e.to_string()))?;
            headers.insert(name, value);
        }

        let ua = user_agent_override
            .map(str::to_string)
            .unwrap_or_else(user_agent::default_user_agent);

        let client = base_builder(timeout)
            .default_headers(headers)
            .user_agent(ua)
            .build()
            .map_err(|e| FetchError::invalid_url("<client>", e.to_string()))?;

        Ok(Self { client, auth })
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// The robots resolver, sitemap fetcher, and verifier issue non-HTML
    /// requests through this so the whole run shares one connection pool.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn base_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(REDIRECT_LIMIT))
        .gzip(true)
        .cookie_store(true)
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url);
        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        // Non-HTML bodies (images, feeds, downloads) are not pages; the
        // crawler marks them visited without parsing.
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or("unknown").to_string();
            if !content_type.to_ascii_lowercase().starts_with("text/html") {
                return Err(FetchError::not_html(url, content_type));
            }
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        debug!(final_url = %final_url, bytes = html.len(), "page fetched");

        Ok(FetchedPage {
            status: status.as_u16(),
            final_url,
            html,
        })
    }
}
