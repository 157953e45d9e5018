use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::Step;
use crate::error::ResolveError;

/// Counters for one feed conversion, written as a CSV row by [`crate::output`].
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub feed_name: Option<String>,
    pub input_files: usize,
    pub duplicate_keys: usize,

    // snapshot outcomes
    pub snapshots: usize,
    pub without_trip: usize,
    pub baselines: usize,
    pub stationary: usize,
    pub transitions: usize,
    pub events: usize,
    pub traces: usize,

    // skipped transitions, by reason
    pub skipped_unknown_stop_sequence: usize,
    pub skipped_unknown_stop: usize,
    pub skipped_missing_stop_translation: usize,
    pub skipped_unknown_trip: usize,
    pub skipped_route_mismatch: usize,
    pub skipped_unknown_route: usize,
    pub skipped_missing_line_translation: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl RunStats {
    pub fn new(feed_name: &str) -> Self {
        RunStats {
            timestamp: Utc::now(),
            feed_name: Some(feed_name.to_string()),
            ..Default::default()
        }
    }

    /// Create an error record for a feed whose conversion failed.
    pub fn from_error(feed_name: &str, error_type: &str, error_message: &str) -> Self {
        RunStats {
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Self::new(feed_name)
        }
    }

    pub fn record(&mut self, step: &Step) {
        self.snapshots += 1;

        match step {
            Step::NoTrip => self.without_trip += 1,
            Step::Baseline => self.baselines += 1,
            Step::Stationary => self.stationary += 1,
            Step::Emitted { trace_created } => {
                self.transitions += 1;
                self.events += 1;
                if *trace_created {
                    self.traces += 1;
                }
            }
            Step::Skipped(e) => {
                self.transitions += 1;
                let counter = match e {
                    ResolveError::UnknownStopSequence { .. } => {
                        &mut self.skipped_unknown_stop_sequence
                    }
                    ResolveError::UnknownStop(_) => &mut self.skipped_unknown_stop,
                    ResolveError::MissingStopTranslation { .. } => {
                        &mut self.skipped_missing_stop_translation
                    }
                    ResolveError::UnknownTrip(_) => &mut self.skipped_unknown_trip,
                    ResolveError::RouteMismatch { .. } => &mut self.skipped_route_mismatch,
                    ResolveError::UnknownRoute(_) => &mut self.skipped_unknown_route,
                    ResolveError::MissingLineTranslation(_) => {
                        &mut self.skipped_missing_line_translation
                    }
                };
                *counter += 1;
            }
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_unknown_stop_sequence
            + self.skipped_unknown_stop
            + self.skipped_missing_stop_translation
            + self.skipped_unknown_trip
            + self.skipped_route_mismatch
            + self.skipped_unknown_route
            + self.skipped_missing_line_translation
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of stop transitions that could not be joined.
    pub fn skipped_pct(&self) -> f64 {
        Self::pct(self.skipped(), self.transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(RunStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(RunStats::pct(50, 100), 50.0);
        assert_eq!(RunStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_record_counts_each_step() {
        let mut stats = RunStats::new("ToeiBus");
        stats.record(&Step::NoTrip);
        stats.record(&Step::Baseline);
        stats.record(&Step::Stationary);
        stats.record(&Step::Emitted {
            trace_created: true,
        });
        stats.record(&Step::Emitted {
            trace_created: false,
        });
        stats.record(&Step::Skipped(ResolveError::UnknownTrip("T9".into())));

        assert_eq!(stats.snapshots, 6);
        assert_eq!(stats.without_trip, 1);
        assert_eq!(stats.baselines, 1);
        assert_eq!(stats.stationary, 1);
        assert_eq!(stats.transitions, 3);
        assert_eq!(stats.events, 2);
        assert_eq!(stats.traces, 1);
        assert_eq!(stats.skipped_unknown_trip, 1);
        assert_eq!(stats.skipped(), 1);
    }

    #[test]
    fn test_skipped_pct() {
        let mut stats = RunStats::default();
        stats.transitions = 4;
        stats.skipped_route_mismatch = 1;

        assert_eq!(stats.skipped_pct(), 25.0);
    }

    #[test]
    fn test_from_error_keeps_feed_name() {
        let stats = RunStats::from_error("ToeiTrain", "table_error", "missing stops.txt");

        assert_eq!(stats.feed_name.as_deref(), Some("ToeiTrain"));
        assert_eq!(stats.error_type.as_deref(), Some("table_error"));
        assert_eq!(stats.snapshots, 0);
    }
}
