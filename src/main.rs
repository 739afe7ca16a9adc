//! CLI entry point for the sitediff tool.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use sitediff_core::{
    ComparisonRun, CrawlConfig, DiscoveryEngine, HttpFetcher, ProgressSnapshot, ProgressTracker,
    VerificationReport, Verifier, load_filters_file,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

mod cli;
mod output;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = ?err, "run failed");
            eprintln!("error: {err:#}");
            ExitCode::from(u8::try_from(output::EXIT_ERROR).unwrap_or(2))
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let extra_filters = match &args.filters_file {
        Some(path) => load_filters_file(path)
            .with_context(|| format!("loading filters from {}", path.display()))?,
        None => Vec::new(),
    };

    let config = CrawlConfig {
        max_pages: args.max_pages as usize,
        max_depth: args.max_depth as usize,
        request_timeout: Duration::from_secs(args.timeout),
        crawl_delay: Duration::from_millis(args.crawl_delay),
        concurrency: usize::from(args.concurrency),
        ignore_robots: args.ignore_robots,
        verify_limit: args.verify_limit as usize,
        extra_filters,
        custom_headers: args.headers.clone(),
        auth: args.auth.clone(),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing in-flight requests");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let method = args.method.resolve(args.combine);
    let engine = DiscoveryEngine::new(
        config.clone(),
        method,
        args.fallback_threshold as usize,
        Arc::clone(&cancel),
    )?;

    info!(old = %args.old_url, new = %args.new_url, method = ?method, "starting comparison");

    let (mut old_tracker, old_rx) =
        ProgressTracker::new(args.old_url.as_str(), config.max_pages);
    let (mut new_tracker, new_rx) =
        ProgressTracker::new(args.new_url.as_str(), config.max_pages);

    let show_progress =
        !args.no_progress && !args.quiet && std::io::stderr().is_terminal();
    let renderers = if show_progress {
        let multi = MultiProgress::new();
        vec![
            spawn_progress_renderer(&multi, old_rx),
            spawn_progress_renderer(&multi, new_rx),
        ]
    } else {
        drop((old_rx, new_rx));
        Vec::new()
    };

    let run_result = engine
        .run(
            &args.old_url,
            &args.new_url,
            &mut old_tracker,
            &mut new_tracker,
        )
        .await;

    // Trackers must drop before the renderers can observe channel closure.
    drop(old_tracker);
    drop(new_tracker);
    for renderer in renderers {
        let _ = renderer.await;
    }

    let comparison_run = run_result?;

    let verification = if args.verify {
        Some(verify(&args, &config, &comparison_run).await?)
    } else {
        None
    };

    print!(
        "{}",
        output::render_report(&comparison_run, verification.as_ref())
    );
    Ok(ExitCode::from(
        u8::try_from(output::exit_code(&comparison_run)).unwrap_or(2),
    ))
}

async fn verify(
    args: &Args,
    config: &CrawlConfig,
    run: &ComparisonRun,
) -> Result<VerificationReport> {
    info!(
        missing = run.comparison.missing.len(),
        added = run.comparison.added.len(),
        limit = config.verify_limit,
        "verifying differences"
    );
    let client = HttpFetcher::new(
        config.request_timeout,
        &config.custom_headers,
        config.auth.clone(),
        None,
    )?
    .inner()
    .clone();
    let verifier = Verifier::new(client, config.request_timeout, config.verify_limit);
    Ok(verifier
        .verify(&run.comparison, &args.old_url, &args.new_url)
        .await)
}

fn spawn_progress_renderer(
    multi: &MultiProgress,
    mut rx: watch::Receiver<ProgressSnapshot>,
) -> JoinHandle<()> {
    let bar = multi.add(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(120));

    tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            let message = format_snapshot(&snapshot);
            if snapshot.finished {
                bar.finish_with_message(message);
                break;
            }
            bar.set_message(message);
            if rx.changed().await.is_err() {
                bar.finish();
                break;
            }
        }
    })
}

fn format_snapshot(snapshot: &ProgressSnapshot) -> String {
    let mut message = format!(
        "{} [{}] {} pages, {} queued",
        snapshot.site, snapshot.phase, snapshot.pages, snapshot.queued
    );
    if snapshot.total_estimate > 0 && !snapshot.finished {
        message.push_str(&format!(" ({:.0}%)", snapshot.percentage));
    }
    if let Some(eta) = snapshot.eta {
        message.push_str(&format!(", ~{}s left", eta.as_secs()));
    }
    message
}
