//! Page fetching: HTTP client seam, error taxonomy, and politeness.
//!
//! The crawler depends on the [`PageFetcher`] trait, not on reqwest: a
//! rendering backend (headless browser) can slot in behind the same seam
//! without the crawler knowing or caring how the HTML was produced.

mod client;
mod error;
mod politeness;

pub use client::{FetchedPage, HttpFetcher, PageFetcher};
pub use error::FetchError;
pub use politeness::PolitenessGate;
