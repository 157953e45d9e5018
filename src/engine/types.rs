//! Data types produced and held by the trace engine.

use chrono::{DateTime, Utc};

use crate::error::ResolveError;

/// Concept name written for every event in the log.
pub const EVENT_NAME: &str = "currentStopSequenceChanged";

/// Which translation keys a feed's reference data uses.
///
/// Bus feeds translate stops by `record_id` and lines by trip headsign; all
/// other feeds translate both by `field_value` (stop name, route long name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Bus,
    Other,
}

impl FeedKind {
    /// `Bus` when the feed name contains `"Bus"` (case-sensitive).
    pub fn from_feed_name(feed_name: &str) -> Self {
        if feed_name.contains("Bus") {
            FeedKind::Bus
        } else {
            FeedKind::Other
        }
    }
}

/// Last observed position of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleState {
    pub stop_sequence: u32,
    pub timestamp: DateTime<Utc>,
}

/// One stop transition of a vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub stop_sequence: u32,
    pub stop_id: String,
    pub stop_name: String,
    pub timestamp: DateTime<Utc>,
}

/// All events of one vehicle, with the line it was first seen running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// The vehicle id.
    pub id: String,
    pub trip_id: String,
    pub route_id: String,
    pub line_name: String,
    pub events: Vec<Event>,
}

/// What the engine did with one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No trip id; ignored without touching vehicle state.
    NoTrip,
    /// First sighting of the vehicle.
    Baseline,
    /// Same stop sequence as last time.
    Stationary,
    /// A transition was resolved and recorded.
    Emitted { trace_created: bool },
    /// A transition could not be resolved and was dropped.
    Skipped(ResolveError),
}
