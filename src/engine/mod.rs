//! Trace reconstruction.
//!
//! [`TraceEngine`] consumes snapshots in input order, keeps the last seen stop
//! sequence per vehicle and turns every change of it into an [`Event`] joined
//! against the [`ReferenceIndex`]. A vehicle's [`Trace`] is created on its
//! first resolved transition; transitions that fail to resolve are dropped
//! without touching the trace.

pub mod resolve;
pub mod types;

use std::collections::HashMap;

use tracing::warn;

use crate::error::SnapshotError;
use crate::reference::ReferenceIndex;
use crate::snapshot::Snapshot;
use crate::stats::RunStats;

pub use types::{EVENT_NAME, Event, FeedKind, Step, Trace, VehicleState};

pub struct TraceEngine<'a> {
    index: &'a ReferenceIndex,
    kind: FeedKind,
    last_state: HashMap<String, VehicleState>,
    traces: Vec<Trace>,
    // vehicle id -> position in `traces`
    trace_slots: HashMap<String, usize>,
}

impl<'a> TraceEngine<'a> {
    pub fn new(index: &'a ReferenceIndex, kind: FeedKind) -> Self {
        Self {
            index,
            kind,
            last_state: HashMap::new(),
            traces: Vec::new(),
            trace_slots: HashMap::new(),
        }
    }

    /// Feeds every snapshot through [`TraceEngine::ingest`], logging and
    /// counting transitions that could not be resolved.
    ///
    /// # Errors
    ///
    /// Stops at the first unreadable snapshot.
    pub fn run<I>(&mut self, snapshots: I, stats: &mut RunStats) -> Result<(), SnapshotError>
    where
        I: IntoIterator<Item = Result<Snapshot, SnapshotError>>,
    {
        for snapshot in snapshots {
            let snapshot = snapshot?;
            let step = self.ingest(&snapshot);

            if let Step::Skipped(e) = &step {
                warn!(
                    vehicle_id = %snapshot.vehicle_id,
                    trip_id = %snapshot.trip_id,
                    stop_sequence = snapshot.stop_sequence,
                    reason = e.kind(),
                    error = %e,
                    "Skipping stop transition"
                );
            }

            stats.record(&step);
        }
        Ok(())
    }

    /// Applies one snapshot to the per-vehicle state.
    pub fn ingest(&mut self, snapshot: &Snapshot) -> Step {
        if snapshot.trip_id.is_empty() {
            return Step::NoTrip;
        }

        let next = VehicleState {
            stop_sequence: snapshot.stop_sequence,
            timestamp: snapshot.timestamp,
        };

        let previous = self
            .last_state
            .get(&snapshot.vehicle_id)
            .map(|s| s.stop_sequence);

        let step = match previous {
            None => Step::Baseline,
            Some(seq) if seq == next.stop_sequence => Step::Stationary,
            Some(_) => self.transition(snapshot),
        };

        // Always track the latest real position, resolved or not.
        self.last_state.insert(snapshot.vehicle_id.clone(), next);
        step
    }

    fn transition(&mut self, snapshot: &Snapshot) -> Step {
        let stop = match resolve::resolve_stop(
            self.index,
            self.kind,
            &snapshot.trip_id,
            snapshot.stop_sequence,
        ) {
            Ok(stop) => stop,
            Err(e) => return Step::Skipped(e),
        };

        let event = Event {
            stop_sequence: snapshot.stop_sequence,
            stop_id: stop.stop_id,
            stop_name: stop.stop_name,
            timestamp: snapshot.timestamp,
        };

        if let Some(&slot) = self.trace_slots.get(&snapshot.vehicle_id) {
            self.traces[slot].events.push(event);
            return Step::Emitted {
                trace_created: false,
            };
        }

        let line = match resolve::resolve_line(
            self.index,
            self.kind,
            &snapshot.trip_id,
            &snapshot.route_id,
        ) {
            Ok(line) => line,
            Err(e) => return Step::Skipped(e),
        };

        self.trace_slots
            .insert(snapshot.vehicle_id.clone(), self.traces.len());
        self.traces.push(Trace {
            id: snapshot.vehicle_id.clone(),
            trip_id: snapshot.trip_id.clone(),
            route_id: line.route_id,
            line_name: line.line_name,
            events: vec![event],
        });

        Step::Emitted {
            trace_created: true,
        }
    }

    pub fn vehicle_state(&self, vehicle_id: &str) -> Option<&VehicleState> {
        self.last_state.get(vehicle_id)
    }

    pub fn trace(&self, vehicle_id: &str) -> Option<&Trace> {
        self.trace_slots.get(vehicle_id).map(|&slot| &self.traces[slot])
    }

    /// Traces in the order they were created.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn into_traces(self) -> Vec<Trace> {
        self.traces
    }
}
