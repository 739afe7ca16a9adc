//! Data-driven exclusion set for discovered paths.
//!
//! The exclusion set is data, not code: built-ins cover the common asset and
//! infrastructure paths, and callers append their own regex patterns at
//! runtime (loaded from a filters file by the CLI) without recompiling
//! anything.

use regex::Regex;
use thiserror::Error;

/// File extensions excluded from discovery (matched against the end of the
/// lowercased path). Assets, documents, and feeds are not pages.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp", ".tiff", ".css", ".js",
    ".mjs", ".pdf", ".zip", ".tar", ".gz", ".rar", ".xml", ".json", ".txt", ".woff", ".woff2",
    ".ttf", ".eot", ".otf", ".mp4", ".mp3", ".avi", ".mov", ".webm", ".doc", ".docx", ".xls",
    ".xlsx", ".ppt", ".pptx",
];

/// Built-in path patterns excluded from discovery.
///
/// Matched against the lowercased canonical path. The final entry is the
/// hashed-media pattern: an opaque hex token following a known media root.
const EXCLUDED_PATH_PATTERNS: &[&str] = &[
    r"^/api/",
    r"^/admin/",
    r"^/wp-admin/",
    r"^/wp-json/",
    r"/chunks/",
    r"/chunk/",
    r"\.chunk\.",
    r"^/embed/",
    r"/wp-content/uploads/",
    r"^/_next/static/",
    r"^/static/",
    r"^/assets/",
    r"^/images/",
    r"^/img/",
    r"^/css/",
    r"^/js/",
    r"^/fonts/",
    r"/media/[^/]+-[a-f0-9]{8,}",
];

/// Error raised when a caller-supplied exclusion pattern does not compile.
///
/// Surfaced at configuration time so a typo in a filters file is a startup
/// error, never a mid-crawl panic.
#[derive(Debug, Error)]
#[error("invalid exclusion pattern {pattern:?}: {reason}")]
pub struct FilterError {
    /// The pattern that failed to compile.
    pub pattern: String,
    /// The regex compiler's message.
    pub reason: String,
}

/// Compiled exclusion set: extension list plus path regexes.
#[derive(Debug)]
pub struct UrlFilters {
    patterns: Vec<Regex>,
}

impl Default for UrlFilters {
    fn default() -> Self {
        Self::builtin()
    }
}

impl UrlFilters {
    /// Returns the built-in exclusion set with no extra patterns.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in patterns are static and known-valid.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn builtin() -> Self {
        let patterns = EXCLUDED_PATH_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in exclusion pattern is valid"))
            .collect();
        Self { patterns }
    }

    /// Builds the exclusion set from the built-ins plus caller-supplied
    /// regex patterns.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] for the first extra pattern that fails to
    /// compile.
    pub fn from_patterns<S: AsRef<str>>(extra: &[S]) -> Result<Self, FilterError> {
        let mut filters = Self::builtin();
        for pattern in extra {
            let pattern = pattern.as_ref();
            let compiled = Regex::new(pattern).map_err(|e| FilterError {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            filters.patterns.push(compiled);
        }
        Ok(filters)
    }

    /// Returns true when the canonical path should be excluded from
    /// discovery.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        let path_lower = path.to_lowercase();

        if EXCLUDED_EXTENSIONS
            .iter()
            .any(|ext| path_lower.ends_with(ext))
        {
            return true;
        }

        self.patterns.iter().any(|p| p.is_match(&path_lower))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_exclude_asset_extensions() {
        let filters = UrlFilters::default();
        for path in ["/app.js", "/theme/style.css", "/logo.PNG", "/font.woff2"] {
            assert!(filters.is_excluded(path), "should exclude {path}");
        }
    }

    #[test]
    fn test_filters_exclude_builtin_path_patterns() {
        let filters = UrlFilters::default();
        for path in [
            "/api/v1/users",
            "/wp-admin/options",
            "/embed/video-1",
            "/wp-content/uploads/2024/01/photo",
            "/_next/static/chunks/main",
            "/build/123.chunk.min",
        ] {
            assert!(filters.is_excluded(path), "should exclude {path}");
        }
    }

    #[test]
    fn test_filters_exclude_hashed_media_paths() {
        let filters = UrlFilters::default();
        assert!(filters.is_excluded("/media/hero-4f3c2a1b9d8e"));
        // Short token is not a content hash
        assert!(!filters.is_excluded("/media-kit"));
    }

    #[test]
    fn test_filters_keep_ordinary_pages() {
        let filters = UrlFilters::default();
        for path in ["/", "/about", "/blog/post-1", "/products/widget"] {
            assert!(!filters.is_excluded(path), "should keep {path}");
        }
    }

    #[test]
    fn test_filters_from_patterns_appends_to_builtins() {
        let filters = UrlFilters::from_patterns(&["^/drafts/"]).unwrap();
        assert!(filters.is_excluded("/drafts/wip-post"));
        // Built-ins still apply
        assert!(filters.is_excluded("/api/v1"));
        assert!(!filters.is_excluded("/blog"));
    }

    #[test]
    fn test_filters_invalid_pattern_is_a_config_error() {
        let result = UrlFilters::from_patterns(&["[unclosed"]);
        let err = result.unwrap_err();
        assert_eq!(err.pattern, "[unclosed");
        assert!(err.to_string().contains("invalid exclusion pattern"));
    }
}
