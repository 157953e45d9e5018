//! Snapshot input: JSON-lines files written by the feed collector.
//!
//! Each line is either a whole GTFS-RT `FeedMessage` (camelCase JSON, one
//! snapshot per vehicle entity) or a single flat snapshot object. Files are
//! selected by an injected name predicate and read lazily in file-name order.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::SnapshotError;

/// One polled observation of a vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub vehicle_id: String,
    pub trip_id: String,
    pub route_id: String,
    pub stop_sequence: u32,
    pub timestamp: DateTime<Utc>,
}

/// Epoch seconds, written as a string by the collector but tolerated as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EpochSeconds {
    Text(String),
    Number(i64),
}

impl EpochSeconds {
    fn to_datetime(&self) -> Result<DateTime<Utc>, String> {
        let secs = match self {
            EpochSeconds::Text(s) => s.trim().parse::<i64>().map_err(|_| s.clone())?,
            EpochSeconds::Number(n) => *n,
        };
        DateTime::from_timestamp(secs, 0).ok_or_else(|| secs.to_string())
    }
}

/// A collector `FeedMessage` is recognised by its `entity` array; anything
/// else must be a flat snapshot object.
#[derive(Debug)]
enum Line {
    Feed(FeedLine),
    Flat(FlatSnapshot),
}

impl Line {
    fn from_json(text: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.get("entity").is_some() {
            serde_json::from_value(value).map(Line::Feed)
        } else {
            serde_json::from_value(value).map(Line::Flat)
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedLine {
    entity: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    id: String,
    #[serde(default)]
    vehicle: Option<VehiclePosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehiclePosition {
    #[serde(default)]
    trip: Option<TripDescriptor>,
    current_stop_sequence: u32,
    timestamp: EpochSeconds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripDescriptor {
    #[serde(default)]
    trip_id: String,
    #[serde(default)]
    route_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatSnapshot {
    vehicle_id: String,
    #[serde(default)]
    trip_id: String,
    #[serde(default)]
    route_id: String,
    current_stop_sequence: u32,
    timestamp: EpochSeconds,
}

/// Parses one input line into the snapshots it carries, in entity order.
///
/// Entities without a vehicle position (trip updates, alerts) yield nothing.
pub fn parse_line(text: &str, path: &Path, line: usize) -> Result<Vec<Snapshot>, SnapshotError> {
    let parsed = Line::from_json(text).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        line,
        source,
    })?;

    let timestamp = |ts: &EpochSeconds| {
        ts.to_datetime().map_err(|value| SnapshotError::Timestamp {
            path: path.to_path_buf(),
            line,
            value,
        })
    };

    match parsed {
        Line::Feed(feed) => {
            let mut out = Vec::with_capacity(feed.entity.len());
            for entity in feed.entity {
                let Some(vehicle) = entity.vehicle else {
                    continue;
                };
                let trip = vehicle.trip.unwrap_or_default();
                out.push(Snapshot {
                    vehicle_id: entity.id,
                    trip_id: trip.trip_id,
                    route_id: trip.route_id,
                    stop_sequence: vehicle.current_stop_sequence,
                    timestamp: timestamp(&vehicle.timestamp)?,
                });
            }
            Ok(out)
        }
        Line::Flat(flat) => Ok(vec![Snapshot {
            timestamp: timestamp(&flat.timestamp)?,
            vehicle_id: flat.vehicle_id,
            trip_id: flat.trip_id,
            route_id: flat.route_id,
            stop_sequence: flat.current_stop_sequence,
        }]),
    }
}

/// Default selection rule: the file name contains the feed name anywhere.
pub fn contains_feed_name(feed_name: &str) -> impl Fn(&str) -> bool + use<> {
    let feed_name = feed_name.to_string();
    move |file_name: &str| file_name.contains(&feed_name)
}

/// Lists the files in `dir` whose names satisfy `select`, sorted by file name.
pub fn select_inputs<F>(dir: &Path, select: F) -> Result<Vec<PathBuf>, SnapshotError>
where
    F: Fn(&str) -> bool,
{
    let io_err = |source| SnapshotError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if select(name) {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}

/// Lazily yields snapshots from a single buffered source.
pub struct SnapshotReader<R> {
    path: PathBuf,
    lines: std::io::Lines<R>,
    line_no: usize,
    pending: VecDeque<Snapshot>,
}

impl<R: BufRead> SnapshotReader<R> {
    /// `path` is only used to label errors.
    pub fn new(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            lines: reader.lines(),
            line_no: 0,
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> Iterator for SnapshotReader<R> {
    type Item = Result<Snapshot, SnapshotError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(snapshot) = self.pending.pop_front() {
                return Some(Ok(snapshot));
            }

            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(SnapshotError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line, &self.path, self.line_no) {
                Ok(snapshots) => self.pending.extend(snapshots),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Snapshots from several files, chained in the given order.
///
/// Each file is opened only when the previous one is exhausted.
pub struct SnapshotStream {
    files: VecDeque<PathBuf>,
    current: Option<SnapshotReader<BufReader<File>>>,
    files_opened: usize,
}

impl SnapshotStream {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files: files.into(),
            current: None,
            files_opened: 0,
        }
    }

    pub fn files_opened(&self) -> usize {
        self.files_opened
    }
}

impl Iterator for SnapshotStream {
    type Item = Result<Snapshot, SnapshotError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }

            let path = self.files.pop_front()?;
            debug!(path = %path.display(), "Reading snapshot file");
            match File::open(&path) {
                Ok(file) => {
                    self.files_opened += 1;
                    self.current = Some(SnapshotReader::new(path, BufReader::new(file)));
                }
                Err(source) => return Some(Err(SnapshotError::Io { path, source })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FEED_LINE: &str = r#"{"header":{"gtfsRealtimeVersion":"2.0","incrementality":"FULL_DATASET","timestamp":"1761830460"},"entity":[{"id":"100009150","isDeleted":false,"tripUpdate":null,"vehicle":{"trip":{"tripId":"T1","startDate":"20251030","routeId":""},"currentStopSequence":1,"currentStatus":"STOPPED_AT","timestamp":"1761830460","stopId":""},"alert":null},{"id":"A1","alert":{},"vehicle":null}]}"#;

    fn read_all(text: &str) -> Vec<Result<Snapshot, SnapshotError>> {
        SnapshotReader::new("mem.jsonl", text.as_bytes()).collect()
    }

    #[test]
    fn test_parse_feed_message_line() {
        let snaps = parse_line(FEED_LINE, Path::new("x.jsonl"), 1).unwrap();

        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].vehicle_id, "100009150");
        assert_eq!(snaps[0].trip_id, "T1");
        assert_eq!(snaps[0].route_id, "");
        assert_eq!(snaps[0].stop_sequence, 1);
        assert_eq!(snaps[0].timestamp.timestamp(), 1761830460);
    }

    #[test]
    fn test_parse_flat_line_with_numeric_timestamp() {
        let line = r#"{"vehicleId":"V1","tripId":"T1","routeId":"R1","currentStopSequence":2,"timestamp":200}"#;
        let snaps = parse_line(line, Path::new("x.jsonl"), 1).unwrap();

        assert_eq!(snaps[0].vehicle_id, "V1");
        assert_eq!(snaps[0].route_id, "R1");
        assert_eq!(snaps[0].timestamp.timestamp(), 200);
    }

    #[test]
    fn test_missing_trip_becomes_empty_trip_id() {
        let line = r#"{"entity":[{"id":"V1","vehicle":{"currentStopSequence":3,"timestamp":"5"}}]}"#;
        let snaps = parse_line(line, Path::new("x.jsonl"), 1).unwrap();

        assert_eq!(snaps[0].trip_id, "");
    }

    #[test]
    fn test_bad_timestamp_is_fatal() {
        let line = r#"{"vehicleId":"V1","tripId":"T1","currentStopSequence":2,"timestamp":"soon"}"#;
        let err = parse_line(line, Path::new("x.jsonl"), 7).unwrap_err();

        match err {
            SnapshotError::Timestamp { line, value, .. } => {
                assert_eq!(line, 7);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error_names_the_missing_field() {
        let flat = r#"{"vehicleId":"V1","tripId":"T1","currentStopSequence":2}"#;
        let err = parse_line(flat, Path::new("x.jsonl"), 3).unwrap_err();

        assert!(matches!(err, SnapshotError::Parse { line: 3, .. }));
        assert!(err.to_string().contains("missing field `timestamp`"), "{err}");

        let feed = r#"{"entity":[{"id":"V1","vehicle":{"timestamp":"5"}}]}"#;
        let err = parse_line(feed, Path::new("x.jsonl"), 4).unwrap_err();

        assert!(err.to_string().contains("currentStopSequence"), "{err}");
    }

    #[test]
    fn test_reader_preserves_order_and_skips_blank_lines() {
        let text = format!(
            "{}\n\n{}\n",
            r#"{"vehicleId":"V1","tripId":"T1","currentStopSequence":1,"timestamp":"100"}"#,
            r#"{"entity":[{"id":"V2","vehicle":{"trip":{"tripId":"T2"},"currentStopSequence":4,"timestamp":"150"}},{"id":"V1","vehicle":{"trip":{"tripId":"T1"},"currentStopSequence":2,"timestamp":"200"}}]}"#
        );
        let snaps: Vec<Snapshot> = read_all(&text).into_iter().map(Result::unwrap).collect();

        let ids: Vec<_> = snaps.iter().map(|s| s.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["V1", "V2", "V1"]);
        assert_eq!(snaps[2].stop_sequence, 2);
    }

    #[test]
    fn test_reader_reports_line_of_parse_error() {
        let text = format!(
            "{}\nnot json\n",
            r#"{"vehicleId":"V1","tripId":"T1","currentStopSequence":1,"timestamp":"100"}"#
        );
        let results = read_all(&text);

        assert!(results[0].is_ok());
        match &results[1] {
            Err(SnapshotError::Parse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_contains_feed_name_is_permissive() {
        let select = contains_feed_name("ToeiBus");

        assert!(select("2025-10-30-ToeiBus.jsonl"));
        assert!(select("ToeiBus-backup.txt"));
        assert!(!select("2025-10-30-ToeiTrain.jsonl"));
    }

    #[test]
    fn test_select_inputs_sorts_by_name() {
        let dir = std::env::temp_dir().join("gtfs_rt_xes_test_select_inputs");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested-ToeiBus")).unwrap();
        for name in [
            "2025-10-31-ToeiBus.jsonl",
            "2025-10-30-ToeiBus.jsonl",
            "2025-10-30-ToeiTrain.jsonl",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }

        let files = select_inputs(&dir, contains_feed_name("ToeiBus")).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["2025-10-30-ToeiBus.jsonl", "2025-10-31-ToeiBus.jsonl"]
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_stream_chains_files_in_order() {
        let dir = std::env::temp_dir().join("gtfs_rt_xes_test_stream_chain");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let first = dir.join("a.jsonl");
        let second = dir.join("b.jsonl");
        fs::write(
            &first,
            r#"{"vehicleId":"V1","tripId":"T1","currentStopSequence":1,"timestamp":"100"}"#,
        )
        .unwrap();
        fs::write(
            &second,
            r#"{"vehicleId":"V1","tripId":"T1","currentStopSequence":2,"timestamp":"200"}"#,
        )
        .unwrap();

        let mut stream = SnapshotStream::new(vec![first, second]);
        let seqs: Vec<u32> = stream
            .by_ref()
            .map(|s| s.unwrap().stop_sequence)
            .collect();

        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(stream.files_opened(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
