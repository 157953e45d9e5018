//! Per-feed run configuration.

use std::path::{Path, PathBuf};

use crate::engine::FeedKind;
use crate::error::ConfigError;

/// Everything one feed conversion needs to know about its inputs and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Feed name, e.g. `ToeiBus`. Selects input files and names the log.
    pub feed_name: String,
    /// Directory holding the collector's `.jsonl` snapshot files.
    pub input_dir: PathBuf,
    /// Directory holding `trips.txt`, `stops.txt`, ... for this feed.
    pub static_dir: PathBuf,
    /// Directory the `.xes` document is written to.
    pub output_dir: PathBuf,
}

impl ConvertConfig {
    /// Uses the `{static_root}/{feed}-static` layout for reference tables.
    pub fn for_feed(feed_name: &str, input_dir: &Path, static_root: &Path, output_dir: &Path) -> Self {
        Self {
            feed_name: feed_name.to_string(),
            input_dir: input_dir.to_path_buf(),
            static_dir: static_root.join(format!("{feed_name}-static")),
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn feed_kind(&self) -> FeedKind {
        FeedKind::from_feed_name(&self.feed_name)
    }

    pub fn output_file_name(&self) -> String {
        format!("{}.xes", self.feed_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.output_file_name())
    }

    /// Checks the configuration before any table or snapshot is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_name.trim().is_empty() {
            return Err(ConfigError::EmptyFeedName);
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingOutputDir);
        }

        match std::fs::metadata(&self.output_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ConfigError::OutputNotADirectory(self.output_dir.clone())),
            Err(_) => return Err(ConfigError::OutputDirNotFound(self.output_dir.clone())),
        }

        if same_dir(&self.output_dir, &self.input_dir) {
            return Err(ConfigError::OutputIsInputDir(self.output_dir.clone()));
        }

        Ok(())
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
