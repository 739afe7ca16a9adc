//! Error types for page and document fetches.

use thiserror::Error;

/// Errors that can occur while fetching a page, sitemap, or robots.txt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Response body is not HTML; the page is marked visited without parsing.
    #[error("non-HTML content at {url}: {content_type}")]
    NotHtml {
        /// The URL that returned a non-HTML body.
        url: String,
        /// The Content-Type header value (or "unknown").
        content_type: String,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The run was cancelled by the user before this fetch completed.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a non-HTML content error.
    pub fn not_html(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::NotHtml {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for failures that mean the host could not be reached at
    /// all (timeout, DNS, connection refused).
    ///
    /// A connection-level failure on the very first request escalates to a
    /// run-level failure; an HTTP error status never does, since the server
    /// is up and the crawl can continue with whatever the frontier holds.
    #[must_use]
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }
}

// Note on From trait implementations:
// There is intentionally no `From<reqwest::Error>` here. Every variant
// carries the URL it failed on, which the source error does not provide;
// the helper constructors force callers to supply that context at the one
// place it is known.
