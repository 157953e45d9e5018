//! Reporting of per-feed [`RunStats`]: a log line when a feed finishes and
//! an optional CSV summary that accumulates one row per feed across runs.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::stats::RunStats;

/// How a finished feed's counters are written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    /// `Debug` dump at debug level.
    #[default]
    Debug,
    /// Pretty JSON at info level, for operators who scrape the stderr log.
    Json,
}

/// Writes `stats` to the log in the requested format.
pub fn log_summary(stats: &RunStats, format: SummaryFormat) -> Result<()> {
    match format {
        SummaryFormat::Debug => debug!("{stats:#?}"),
        SummaryFormat::Json => info!("{}", summary_json(stats)?),
    }
    Ok(())
}

pub fn summary_json(stats: &RunStats) -> Result<String> {
    serde_json::to_string_pretty(stats).context("serializing run statistics")
}

/// Appends `stats` as one row to the summary CSV at `path`.
///
/// The header row is written only when the file is new or still empty, so
/// rows from successive runs line up under a single header.
pub fn append_summary_row(path: &Path, stats: &RunStats) -> Result<()> {
    let needs_header = std::fs::metadata(path).map_or(true, |m| m.len() == 0);
    debug!(path = %path.display(), needs_header, "Appending run summary row");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening summary CSV {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer.serialize(stats)?;
    writer.flush()?;

    Ok(())
}
