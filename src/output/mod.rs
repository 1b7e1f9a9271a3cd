//! Output module for reporting crawl results
//!
//! This module handles:
//! - Printing a human-readable summary to the terminal
//! - Exporting the full result as JSON

mod json;
mod summary;

pub use json::write_json;
pub use summary::{format_summary, print_summary};
