//! Run configuration and validation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Hard ceiling on concurrent fetches per site.
pub const MAX_CONCURRENCY: usize = 64;

/// Settings shared by both sites' discoveries.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Stop a crawl after this many pages.
    pub max_pages: usize,
    /// Links found beyond this depth from the homepage are not followed.
    pub max_depth: usize,
    /// Per-request timeout for page fetches.
    pub request_timeout: Duration,
    /// Minimum spacing between requests to the same host. Zero disables it.
    pub crawl_delay: Duration,
    /// Concurrent fetches per site.
    pub concurrency: usize,
    /// Skip robots.txt Disallow directives (sitemap hints are still used).
    pub ignore_robots: bool,
    /// Cap on existence checks during report verification.
    pub verify_limit: usize,
    /// Extra exclusion patterns on top of the built-in set.
    pub extra_filters: Vec<String>,
    /// Headers attached to every request.
    pub custom_headers: Vec<(String, String)>,
    /// HTTP basic auth credentials.
    pub auth: Option<(String, String)>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 10_000,
            max_depth: 5,
            request_timeout: Duration::from_secs(10),
            crawl_delay: Duration::from_millis(50),
            concurrency: 3,
            ignore_robots: false,
            verify_limit: 50,
            extra_filters: Vec::new(),
            custom_headers: Vec::new(),
            auth: None,
        }
    }
}

impl CrawlConfig {
    /// Checks value ranges. The CLI enforces most of these too; this guards
    /// programmatic construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::invalid_value("max_pages", "must be at least 1"));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::invalid_value(
                "concurrency",
                format!("must be between 1 and {MAX_CONCURRENCY}"),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "request_timeout",
                "must be non-zero",
            ));
        }
        Ok(())
    }
}

/// A configuration value or file was unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("cannot read filters file {path}: {source}")]
    FiltersIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filters file {path} is malformed: {reason}")]
    FiltersFormat { path: String, reason: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Accepted shapes of a filters file: a bare array of patterns, or an object
/// with an `excluded_patterns` key.
#[derive(Deserialize)]
#[serde(untagged)]
enum FiltersFile {
    Patterns(Vec<String>),
    Keyed { excluded_patterns: Vec<String> },
}

/// Loads extra exclusion patterns from a JSON file.
pub fn load_filters_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::FiltersIo {
        path: display.clone(),
        source,
    })?;
    let parsed: FiltersFile =
        serde_json::from_str(&raw).map_err(|err| ConfigError::FiltersFormat {
            path: display,
            reason: err.to_string(),
        })?;
    Ok(match parsed {
        FiltersFile::Patterns(patterns) | FiltersFile::Keyed {
            excluded_patterns: patterns,
        } => patterns,
    })
}
