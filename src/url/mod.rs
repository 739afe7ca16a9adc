//! URL canonicalization and exclusion filtering.
//!
//! Every URL that enters the discovery pipeline (crawl links, sitemap
//! entries, seed arguments) passes through [`canonicalize`] first, so the
//! rest of the engine only ever sees [`NormalizedUrl`] values with a single,
//! path-based identity.

mod canonicalize;
mod filters;

pub use canonicalize::{MAX_URL_LENGTH, NormalizedUrl, Reject, canonicalize};
pub(crate) use canonicalize::{origin, same_site};
pub use filters::{FilterError, UrlFilters};
