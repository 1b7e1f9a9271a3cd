//! JSON export of a crawl result

use crate::state::CrawlResult;
use crate::WalkError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the full crawl result as pretty-printed JSON
///
/// # Arguments
///
/// * `result` - The crawl result to export
/// * `output_path` - Destination file; created or truncated
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the file
/// * `Err(WalkError)` - Failed to create, serialize or flush
pub fn write_json(result: &CrawlResult, output_path: &Path) -> Result<(), WalkError> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
