//! Error types for the conversion pipeline.
//!
//! Fatal conditions (configuration, reference tables, snapshot input) abort the
//! run for a feed. [`ResolveError`] is the per-transition, recoverable case:
//! the engine skips the transition and carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid run configuration, detected before any input is read.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("feed name must not be empty")]
    EmptyFeedName,

    #[error("output directory is not set")]
    MissingOutputDir,

    #[error("output directory {0} does not exist")]
    OutputDirNotFound(PathBuf),

    #[error("output path {0} is not a directory")]
    OutputNotADirectory(PathBuf),

    #[error("output directory {0} is also the snapshot input directory")]
    OutputIsInputDir(PathBuf),
}

/// Failure to load one of the static reference tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to open {table} at {path}: {source}")]
    Open {
        table: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{table} is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("malformed row in {table}: {source}")]
    Row {
        table: &'static str,
        source: csv::Error,
    },
}

/// Unreadable snapshot input. Always fatal for the run.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid snapshot JSON: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("{path}:{line}: invalid timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

/// Why a single stop transition could not be joined against the reference data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no stop assigned to sequence {stop_sequence} of trip {trip_id}")]
    UnknownStopSequence { trip_id: String, stop_sequence: u32 },

    #[error("stop {0} not found")]
    UnknownStop(String),

    #[error("no English translation for stop {stop_id} ({stop_name})")]
    MissingStopTranslation { stop_id: String, stop_name: String },

    #[error("trip {0} not found")]
    UnknownTrip(String),

    #[error("snapshot route {reported} does not match static route {expected}")]
    RouteMismatch { reported: String, expected: String },

    #[error("route {0} not found")]
    UnknownRoute(String),

    #[error("no English translation for line name '{0}'")]
    MissingLineTranslation(String),
}

impl ResolveError {
    /// Short, stable label used for per-kind counters.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::UnknownStopSequence { .. } => "unknown_stop_sequence",
            ResolveError::UnknownStop(_) => "unknown_stop",
            ResolveError::MissingStopTranslation { .. } => "missing_stop_translation",
            ResolveError::UnknownTrip(_) => "unknown_trip",
            ResolveError::RouteMismatch { .. } => "route_mismatch",
            ResolveError::UnknownRoute(_) => "unknown_route",
            ResolveError::MissingLineTranslation(_) => "missing_line_translation",
        }
    }
}
