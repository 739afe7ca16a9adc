//! Sitediff Core Library
//!
//! This library discovers the reachable pages of two websites and reports
//! their path-level differences, for checking that a site migration or
//! redesign did not silently drop pages.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`url`] - Canonicalization and the path-based page identity
//! - [`fetch`] - HTTP client, error taxonomy, per-host politeness
//! - [`robots`] - robots.txt policies and per-origin caching
//! - [`sitemap`] - Sitemap location, index expansion, entry extraction
//! - [`crawl`] - Breadth-first crawling and link extraction
//! - [`discovery`] - Per-site orchestration and the two-site run
//! - [`compare`] - Path-set comparison and live verification

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compare;
pub mod config;
pub mod crawl;
pub mod discovery;
pub mod fetch;
pub mod progress;
pub mod robots;
pub mod sitemap;
pub mod url;

mod user_agent;

// Re-export commonly used types
pub use compare::{Comparison, VerificationReport, Verifier};
pub use config::{ConfigError, CrawlConfig, MAX_CONCURRENCY, load_filters_file};
pub use crawl::{CrawlOutcome, CrawlState, Crawler};
pub use discovery::{
    ComparisonRun, DEFAULT_FALLBACK_THRESHOLD, DiscoveredSite, DiscoveryEngine, DiscoveryError,
    DiscoveryMethod, MethodUsed,
};
pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher, PolitenessGate};
pub use progress::{ProgressPhase, ProgressSnapshot, ProgressTracker};
pub use sitemap::{SitemapOutcome, SitemapScanner};
pub use crate::url::{NormalizedUrl, UrlFilters, canonicalize};
