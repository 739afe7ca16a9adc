//! Breadth-first crawl frontier with path-level dedup.

use std::collections::{HashSet, VecDeque};

use crate::url::NormalizedUrl;

/// A URL waiting to be fetched, with its link distance from the seed.
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: NormalizedUrl,
    pub depth: usize,
}

/// FIFO queue of pending URLs. A path enters the frontier at most once,
/// ever; re-discovering an already-queued or already-fetched path is a no-op.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    seen: HashSet<String>,
}

impl Frontier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `url` unless its path was already seen. Returns whether it
    /// was enqueued.
    pub fn push(&mut self, url: NormalizedUrl, depth: usize) -> bool {
        if !self.seen.insert(url.comparison_key().to_string()) {
            return false;
        }
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::url::{UrlFilters, canonicalize};
    use url::Url;

    fn normalized(raw: &str) -> NormalizedUrl {
        let base = Url::parse("https://example.com/").unwrap();
        canonicalize(raw, &base, &UrlFilters::default()).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(normalized("/a"), 0);
        frontier.push(normalized("/b"), 1);
        assert_eq!(frontier.pop().unwrap().url.path, "/a");
        assert_eq!(frontier.pop().unwrap().url.path, "/b");
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_dedup_by_path() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(normalized("/a"), 0));
        assert!(!frontier.push(normalized("https://www.example.com/a/"), 1));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_popped_path_is_never_requeued() {
        let mut frontier = Frontier::new();
        frontier.push(normalized("/a"), 0);
        let _ = frontier.pop();
        assert!(!frontier.push(normalized("/a"), 2));
        assert!(frontier.is_empty());
    }
}
