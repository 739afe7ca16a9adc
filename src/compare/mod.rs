//! Path-level comparison of two discovered sites.

mod verify;

pub use verify::{VerificationReport, Verifier};

use std::collections::BTreeSet;

/// Path-level difference between two sites' discovered page sets.
///
/// All three partitions are sorted; paths compare identically regardless of
/// which domain they were discovered on.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Paths present on both sites.
    pub matched: Vec<String>,
    /// Paths on the old site with no counterpart on the new one.
    pub missing: Vec<String>,
    /// Paths on the new site that the old one never had.
    pub added: Vec<String>,
}

impl Comparison {
    /// Partitions the two discovered path sets.
    #[must_use]
    pub fn compute(old: &BTreeSet<String>, new: &BTreeSet<String>) -> Self {
        Self {
            matched: old.intersection(new).cloned().collect(),
            missing: old.difference(new).cloned().collect(),
            added: new.difference(old).cloned().collect(),
        }
    }

    /// Share of the old site's pages that survived onto the new site, in
    /// percent. Zero when the old site had no pages at all.
    #[must_use]
    pub fn match_percentage(&self) -> f64 {
        let old_total = self.matched.len() + self.missing.len();
        if old_total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.matched.len() as f64 / old_total as f64 * 100.0
        }
    }

    /// True when the sites expose exactly the same paths.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.missing.is_empty() && self.added.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn test_compute_partitions() {
        let comparison = Comparison::compute(&set(&["/a", "/b", "/c"]), &set(&["/b", "/c", "/d"]));
        assert_eq!(comparison.matched, vec!["/b", "/c"]);
        assert_eq!(comparison.missing, vec!["/a"]);
        assert_eq!(comparison.added, vec!["/d"]);
        assert!(!comparison.is_identical());
    }

    #[test]
    fn test_match_percentage() {
        let comparison = Comparison::compute(&set(&["/a", "/b", "/c"]), &set(&["/b", "/c", "/d"]));
        let pct = comparison.match_percentage();
        assert!((pct - 66.666).abs() < 0.01, "got {pct}");
    }

    #[test]
    fn test_swapping_sides_swaps_partitions() {
        let a = set(&["/a", "/b", "/c"]);
        let b = set(&["/b", "/c", "/d"]);
        let forward = Comparison::compute(&a, &b);
        let reverse = Comparison::compute(&b, &a);
        assert_eq!(forward.added, reverse.missing);
        assert_eq!(forward.missing, reverse.added);
        assert_eq!(forward.matched, reverse.matched);
    }

    #[test]
    fn test_identical_sites() {
        let comparison = Comparison::compute(&set(&["/", "/a"]), &set(&["/", "/a"]));
        assert!(comparison.is_identical());
        assert!((comparison.match_percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_old_site_has_zero_percentage() {
        let comparison = Comparison::compute(&set(&[]), &set(&["/new"]));
        assert!(comparison.match_percentage().abs() < f64::EPSILON);
        assert_eq!(comparison.added, vec!["/new"]);
    }

    #[test]
    fn test_disjoint_sites() {
        let comparison = Comparison::compute(&set(&["/a"]), &set(&["/b"]));
        assert!(comparison.match_percentage().abs() < f64::EPSILON);
        assert_eq!(comparison.matched, Vec::<String>::new());
    }
}
