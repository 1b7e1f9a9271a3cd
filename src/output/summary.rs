//! Terminal summary of a finished crawl

use crate::state::CrawlResult;
use std::fmt::Write;

/// How many errors the summary lists individually
const MAX_LISTED_ERRORS: usize = 10;

/// Formats a crawl result as a plain-text report
///
/// # Arguments
///
/// * `result` - The finished (or stopped) crawl
///
/// # Returns
///
/// The report, one section per block, ending with a newline
pub fn format_summary(result: &CrawlResult) -> String {
    let stats = &result.stats;
    let mut out = String::new();

    // Writing to a String can't fail
    let _ = writeln!(out, "=== Crawl Summary ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Started: {}", stats.start_time.to_rfc3339());
    let _ = writeln!(out, "  Elapsed: {:.1}s", stats.elapsed_ms as f64 / 1000.0);
    let _ = writeln!(out, "  Pages crawled: {}", stats.processed);
    let _ = writeln!(out, "  Errors: {}", stats.failed);
    let _ = writeln!(out, "  Blocked by robots.txt: {}", stats.skipped);
    let _ = writeln!(out, "  Duplicates skipped: {}", stats.duplicates);
    let _ = writeln!(out, "  Left in queue: {}", stats.queued);
    let _ = writeln!(out, "  Pages/sec: {:.2}", stats.pages_per_second());
    let _ = writeln!(out);

    let breakdown = result.depth_breakdown();
    if !breakdown.is_empty() {
        let _ = writeln!(out, "Pages by Depth:");
        for (depth, count) in &breakdown {
            let _ = writeln!(out, "  {}: {}", depth, count);
        }
        let _ = writeln!(out);
    }

    if !result.errors.is_empty() {
        let _ = writeln!(out, "Errors ({}):", result.errors.len());
        for error in result.errors.iter().take(MAX_LISTED_ERRORS) {
            let _ = writeln!(out, "  - {}: {}", error.url, error.message);
        }
        if result.errors.len() > MAX_LISTED_ERRORS {
            let _ = writeln!(
                out,
                "  ... and {} more",
                result.errors.len() - MAX_LISTED_ERRORS
            );
        }
        let _ = writeln!(out);
    }

    let attempted = stats.processed + stats.failed;
    let success_rate = if attempted > 0 {
        (stats.processed as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} fetched pages)",
        success_rate, stats.processed, attempted
    );

    out
}

/// Prints the crawl summary to stdout
pub fn print_summary(result: &CrawlResult) {
    print!("{}", format_summary(result));
}
