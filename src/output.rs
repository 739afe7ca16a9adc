//! Report formatting for the CLI.
//!
//! Rendering is pure string building so it can be tested without a terminal;
//! `main` decides where the text goes.

use sitediff_core::{ComparisonRun, CrawlState, DiscoveredSite, VerificationReport};

/// Most paths listed per report section before eliding the rest.
pub const MAX_LISTED_PATHS: usize = 50;

/// Exit code when the two sites expose identical paths.
pub const EXIT_IDENTICAL: i32 = 0;
/// Exit code when differences were found.
pub const EXIT_DIFFERENCES: i32 = 1;
/// Exit code for a run-level failure.
pub const EXIT_ERROR: i32 = 2;

/// Maps a completed run to the process exit code.
#[must_use]
pub fn exit_code(run: &ComparisonRun) -> i32 {
    if run.comparison.is_identical() {
        EXIT_IDENTICAL
    } else {
        EXIT_DIFFERENCES
    }
}

/// Renders the full comparison report.
#[must_use]
pub fn render_report(run: &ComparisonRun, verification: Option<&VerificationReport>) -> String {
    let mut out = String::new();

    out.push_str("Site comparison\n");
    out.push_str("===============\n\n");
    out.push_str(&site_summary_line("Old site", &run.old));
    out.push_str(&site_summary_line("New site", &run.new));
    out.push('\n');

    out.push_str(&format!(
        "Match: {:.1}% of the old site's pages were found on the new site\n",
        run.comparison.match_percentage()
    ));
    out.push_str(&format!(
        "Matched {} | missing {} | new {}\n",
        run.comparison.matched.len(),
        run.comparison.missing.len(),
        run.comparison.added.len()
    ));

    if run.comparison.is_identical() {
        out.push_str("\nThe two sites expose identical paths.\n");
    } else {
        push_path_section(
            &mut out,
            "Missing from the new site",
            &run.comparison.missing,
        );
        push_path_section(&mut out, "New on the new site", &run.comparison.added);
    }

    if let Some(report) = verification {
        push_verification(&mut out, report);
    }

    push_notices(&mut out, run);
    out
}

fn site_summary_line(label: &str, site: &DiscoveredSite) -> String {
    format!(
        "{label}: {} ({} pages via {})\n",
        site.site,
        site.pages.len(),
        site.method_used
    )
}

fn push_path_section(out: &mut String, title: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title} ({}):\n", paths.len()));
    for path in paths.iter().take(MAX_LISTED_PATHS) {
        out.push_str(&format!("  {path}\n"));
    }
    if paths.len() > MAX_LISTED_PATHS {
        out.push_str(&format!("  … and {} more\n", paths.len() - MAX_LISTED_PATHS));
    }
}

fn push_verification(out: &mut String, report: &VerificationReport) {
    out.push_str(&format!("\nVerification ({} paths probed", report.checked()));
    if report.truncated {
        out.push_str(", capped");
    }
    out.push_str("):\n");
    out.push_str(&format!(
        "  missing confirmed: {}\n",
        report.confirmed_missing.len()
    ));
    if !report.false_missing.is_empty() {
        out.push_str(&format!(
            "  reported missing but actually live: {}\n",
            report.false_missing.len()
        ));
        for path in report.false_missing.iter().take(MAX_LISTED_PATHS) {
            out.push_str(&format!("    {path}\n"));
        }
    }
    out.push_str(&format!("  new confirmed: {}\n", report.confirmed_new.len()));
    if !report.false_new.is_empty() {
        out.push_str(&format!(
            "  reported new but already on the old site: {}\n",
            report.false_new.len()
        ));
        for path in report.false_new.iter().take(MAX_LISTED_PATHS) {
            out.push_str(&format!("    {path}\n"));
        }
    }
}

fn push_notices(out: &mut String, run: &ComparisonRun) {
    let mut notices: Vec<String> = Vec::new();

    for site in [&run.old, &run.new] {
        match site.crawl_state {
            Some(CrawlState::LimitReached) => notices.push(format!(
                "page cap reached on {}; {} URLs were still queued, results are partial",
                site.site, site.remaining_queue
            )),
            Some(CrawlState::Cancelled) => notices.push(format!(
                "run was interrupted while crawling {}; results are partial",
                site.site
            )),
            _ => {}
        }
        if site.blocked_by_robots > 0 {
            notices.push(format!(
                "{} URLs on {} were skipped per robots.txt",
                site.blocked_by_robots, site.site
            ));
        }
        notices.extend(site.warnings.iter().cloned());
    }

    if !notices.is_empty() {
        out.push_str("\nNotices:\n");
        for notice in notices {
            out.push_str(&format!("  - {notice}\n"));
        }
    }
}
