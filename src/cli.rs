//! CLI argument definitions using clap derive macros.

use clap::{Parser, ValueEnum};
use url::Url;

use sitediff_core::{DEFAULT_FALLBACK_THRESHOLD, DiscoveryMethod, MAX_CONCURRENCY};

/// Compare the reachable pages of two websites.
///
/// Sitediff discovers every page of an old and a new site (via sitemaps,
/// crawling, or both) and reports which paths went missing and which are new.
#[derive(Parser, Debug)]
#[command(name = "sitediff")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the original site
    #[arg(value_name = "OLD_URL", value_parser = parse_site_url)]
    pub old_url: Url,

    /// URL of the site to compare against
    #[arg(value_name = "NEW_URL", value_parser = parse_site_url)]
    pub new_url: Url,

    /// Discovery method
    #[arg(short = 'm', long, value_enum, default_value_t = MethodArg::Crawl)]
    pub method: MethodArg,

    /// Run both sitemap and crawl discovery and union the results
    #[arg(long)]
    pub combine: bool,

    /// Stop each crawl after this many pages (1-1000000)
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u32).range(1..=1_000_000))]
    pub max_pages: u32,

    /// Maximum link depth followed from the homepage (0-50)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(0..=50))]
    pub max_depth: u32,

    /// Per-request timeout in seconds (1-300)
    #[arg(short = 't', long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout: u64,

    /// Minimum delay between requests to the same host in milliseconds
    /// (0 to disable, max 60000)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub crawl_delay: u64,

    /// Concurrent fetches per site (1-64)
    #[arg(short = 'c', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=MAX_CONCURRENCY as i64))]
    pub concurrency: u8,

    /// Skip robots.txt Disallow directives (sitemap hints are still used)
    #[arg(long)]
    pub ignore_robots: bool,

    /// Crawl results below this page count trigger the sitemap fallback
    #[arg(long, default_value_t = DEFAULT_FALLBACK_THRESHOLD as u32, value_parser = clap::value_parser!(u32))]
    pub fallback_threshold: u32,

    /// JSON file with extra exclusion patterns
    #[arg(long, value_name = "FILE")]
    pub filters_file: Option<std::path::PathBuf>,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// HTTP basic auth credentials as USER:PASSWORD
    #[arg(long, value_name = "USER:PASSWORD", value_parser = parse_key_value)]
    pub auth: Option<(String, String)>,

    /// Probe reported differences against the live sites
    #[arg(long)]
    pub verify: bool,

    /// Cap on existence checks when --verify is set (1-1000)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub verify_limit: u32,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// CLI-facing discovery method names.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    Sitemap,
    Crawl,
    Combined,
}

impl MethodArg {
    /// Resolves the flags into the engine's method. `--combine` wins over
    /// `--method`.
    #[must_use]
    pub fn resolve(self, combine: bool) -> DiscoveryMethod {
        if combine {
            return DiscoveryMethod::Combined;
        }
        match self {
            Self::Sitemap => DiscoveryMethod::Sitemap,
            Self::Crawl => DiscoveryMethod::Crawl,
            Self::Combined => DiscoveryMethod::Combined,
        }
    }
}

fn parse_site_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}; use http or https", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    Ok(url)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME:VALUE, got {raw:?}")),
    }
}
