//! One feed, end to end: reference tables, snapshots, traces, XES bytes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::ConvertConfig;
use crate::engine::{Trace, TraceEngine};
use crate::reference::{DuplicateCounts, ReferenceIndex, ReferenceTables};
use crate::snapshot::{SnapshotStream, contains_feed_name, select_inputs};
use crate::stats::RunStats;
use crate::xes;

/// Result of converting one feed.
#[derive(Debug)]
pub struct Conversion {
    pub stats: RunStats,
    pub traces: Vec<Trace>,
    /// The rendered XES document.
    pub document: Bytes,
}

/// Row and duplicate counts of a feed's reference data plus its input files.
#[derive(Debug)]
pub struct Inspection {
    pub input_files: Vec<PathBuf>,
    pub trips: usize,
    pub routes: usize,
    pub stops: usize,
    pub stop_times: usize,
    pub translations: usize,
    pub duplicates: DuplicateCounts,
}

/// Loads the static tables in `dir` and indexes them.
pub fn load_reference(dir: &Path) -> Result<(ReferenceTables, ReferenceIndex)> {
    let tables = ReferenceTables::load(dir)
        .with_context(|| format!("loading reference tables from {}", dir.display()))?;
    let index = ReferenceIndex::build(&tables);

    let duplicates = index.duplicates();
    if duplicates.total() > 0 {
        warn!(
            trips = duplicates.trips,
            routes = duplicates.routes,
            stops = duplicates.stops,
            stop_times = duplicates.stop_times,
            translations_by_record_id = duplicates.translations_by_record_id,
            translations_by_field_value = duplicates.translations_by_field_value,
            "Duplicate reference keys, keeping the last row of each"
        );
    }

    Ok((tables, index))
}

/// Converts a feed, selecting input files whose name contains the feed name.
pub fn convert_feed(config: &ConvertConfig) -> Result<Conversion> {
    convert_feed_with(config, contains_feed_name(&config.feed_name))
}

/// Converts a feed, selecting input files with `select`.
///
/// # Errors
///
/// Invalid configuration, unreadable reference tables, or any unparseable
/// snapshot line. Transitions that fail to resolve are not errors.
pub fn convert_feed_with<F>(config: &ConvertConfig, select: F) -> Result<Conversion>
where
    F: Fn(&str) -> bool,
{
    config.validate()?;

    let (tables, index) = load_reference(&config.static_dir)?;
    info!(
        trips = tables.trips.len(),
        stops = tables.stops.len(),
        stop_times = tables.stop_times.len(),
        "Reference data loaded"
    );
    drop(tables);

    let files = select_inputs(&config.input_dir, select)?;
    if files.is_empty() {
        warn!(input_dir = %config.input_dir.display(), "No snapshot files selected");
    }

    let mut stats = RunStats::new(&config.feed_name);
    stats.duplicate_keys = index.duplicates().total();

    let mut engine = TraceEngine::new(&index, config.feed_kind());
    let mut stream = SnapshotStream::new(files);
    engine.run(&mut stream, &mut stats)?;
    stats.input_files = stream.files_opened();

    let traces = engine.into_traces();
    let document = Bytes::from(xes::render(&config.feed_name, &traces)?);

    info!(
        files = stats.input_files,
        snapshots = stats.snapshots,
        transitions = stats.transitions,
        events = stats.events,
        traces = stats.traces,
        skipped = stats.skipped(),
        skipped_pct = stats.skipped_pct(),
        "Conversion finished"
    );

    Ok(Conversion {
        stats,
        traces,
        document,
    })
}

/// Reports what a conversion would read, without running it.
pub fn inspect_feed(config: &ConvertConfig) -> Result<Inspection> {
    let (tables, index) = load_reference(&config.static_dir)?;
    let input_files = select_inputs(&config.input_dir, contains_feed_name(&config.feed_name))?;

    Ok(Inspection {
        input_files,
        trips: tables.trips.len(),
        routes: tables.routes.len(),
        stops: tables.stops.len(),
        stop_times: tables.stop_times.len(),
        translations: tables.translations.len(),
        duplicates: index.duplicates(),
    })
}
