//! Optional live verification of a comparison's differences.
//!
//! Discovery can under-count (a page exists but nothing links to it), so a
//! difference is only a claim until checked. Verification probes each
//! reported difference against the site that supposedly lacks it: a
//! "missing" path is re-checked on the new site, an "added" path on the old.
//! Probes are cheap HEAD requests, falling back to GET for servers that
//! reject HEAD.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, instrument, warn};
use url::Url;

use super::Comparison;

/// Outcome of verifying a comparison's differences.
#[derive(Debug, Default)]
pub struct VerificationReport {
    /// Missing paths that really do not respond on the new site.
    pub confirmed_missing: Vec<String>,
    /// Missing paths that actually exist on the new site; discovery simply
    /// never reached them.
    pub false_missing: Vec<String>,
    /// Added paths absent from the old site.
    pub confirmed_new: Vec<String>,
    /// Added paths the old site serves too.
    pub false_new: Vec<String>,
    /// Set when a partition was larger than the verification cap.
    pub truncated: bool,
}

impl VerificationReport {
    /// Total probes performed.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.confirmed_missing.len()
            + self.false_missing.len()
            + self.confirmed_new.len()
            + self.false_new.len()
    }
}

/// Probes reported differences against the live sites.
pub struct Verifier {
    client: reqwest::Client,
    timeout: Duration,
    limit: usize,
}

impl Verifier {
    #[must_use]
    pub fn new(client: reqwest::Client, timeout: Duration, limit: usize) -> Self {
        Self {
            client,
            timeout,
            limit,
        }
    }

    /// Verifies `comparison`, probing at most `limit` paths per partition.
    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        comparison: &Comparison,
        old_site: &Url,
        new_site: &Url,
    ) -> VerificationReport {
        let mut report = VerificationReport {
            truncated: comparison.missing.len() > self.limit
                || comparison.added.len() > self.limit,
            ..VerificationReport::default()
        };

        let new_origin = crate::url::origin(new_site);
        for path in comparison.missing.iter().take(self.limit) {
            if self.exists(&format!("{new_origin}{path}")).await {
                report.false_missing.push(path.clone());
            } else {
                report.confirmed_missing.push(path.clone());
            }
        }

        let old_origin = crate::url::origin(old_site);
        for path in comparison.added.iter().take(self.limit) {
            if self.exists(&format!("{old_origin}{path}")).await {
                report.false_new.push(path.clone());
            } else {
                report.confirmed_new.push(path.clone());
            }
        }

        debug!(
            checked = report.checked(),
            truncated = report.truncated,
            "verification done"
        );
        report
    }

    /// Whether `url` responds with a non-error status. An unreachable probe
    /// counts as not existing; the report is about what a visitor would get.
    async fn exists(&self, url: &str) -> bool {
        let head = self
            .client
            .head(url)
            .timeout(self.timeout)
            .send()
            .await;
        match head {
            Ok(resp) if resp.status() == StatusCode::METHOD_NOT_ALLOWED => {
                match self.client.get(url).timeout(self.timeout).send().await {
                    Ok(resp) => resp.status().as_u16() < 400,
                    Err(err) => {
                        warn!(url = %url, error = %err, "verification probe failed");
                        false
                    }
                }
            }
            Ok(resp) => resp.status().as_u16() < 400,
            Err(err) => {
                warn!(url = %url, error = %err, "verification probe failed");
                false
            }
        }
    }
}
