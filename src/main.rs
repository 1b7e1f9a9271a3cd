//! Sitewalk main entry point
//!
//! This is the command-line interface for the Sitewalk crawl engine.

use anyhow::Context;
use clap::Parser;
use sitewalk::config::{load_config, validate, Config};
use sitewalk::output::{print_summary, write_json};
use sitewalk::Crawler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// How often (in completed items) a progress line is logged
const PROGRESS_EVERY: usize = 10;

/// Sitewalk: a polite single-site crawler
///
/// Sitewalk crawls one website breadth-first from a seed URL while
/// respecting robots.txt and a global request delay, then prints a summary
/// and optionally writes every page record as JSON.
#[derive(Parser, Debug)]
#[command(name = "sitewalk")]
#[command(version)]
#[command(about = "A polite single-site crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of pages to record
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Maximum link depth from the seed
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Minimum delay between requests in milliseconds
    #[arg(long, value_name = "N")]
    delay_ms: Option<u64>,

    /// Do not fetch or obey robots.txt
    #[arg(long)]
    no_robots: bool,

    /// Write the full result as JSON to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let output_path = cli
        .output
        .clone()
        .or_else(|| config.output.json_path.as_ref().map(PathBuf::from));

    let crawler = Crawler::new(config).context("Failed to initialize crawler")?;
    let mut handle = crawler.start(&cli.seed)?;

    // Ctrl-C stops the crawl; the partial result is still reported
    let stop = handle.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            stop.cancel();
        }
    });

    if let Some(mut progress) = handle.take_progress() {
        tokio::spawn(async move {
            let mut last_logged = 0;
            while let Some(stats) = progress.recv().await {
                let completed = stats.completed();
                if completed >= last_logged + PROGRESS_EVERY {
                    last_logged = completed;
                    tracing::info!(
                        "Progress: {} pages, {} errors, {} skipped, {} queued ({:.1} pages/sec)",
                        stats.processed,
                        stats.failed,
                        stats.skipped,
                        stats.queued,
                        stats.pages_per_second()
                    );
                }
            }
        });
    }

    let result = handle.join().await.context("Crawl failed")?;

    if !cli.quiet {
        print_summary(&result);
    }

    if let Some(path) = output_path {
        write_json(&result, &path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        tracing::info!("Results written to: {}", path.display());
    }

    Ok(())
}

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrency = concurrency;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.request_delay_ms = delay_ms;
    }
    if cli.no_robots {
        config.crawler.respect_robots = false;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitewalk=info,warn"),
            1 => EnvFilter::new("sitewalk=debug,info"),
            2 => EnvFilter::new("sitewalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
