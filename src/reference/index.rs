//! O(1) lookups over the static tables, keyed for the joins the engine makes.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use super::tables::{ReferenceTables, RouteRow, StopRow, TripRow};

/// Language code of the translation rows that are indexed.
pub const ENGLISH: &str = "en";

/// How many rows were overwritten by a later row with the same key, per lookup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateCounts {
    pub trips: usize,
    pub routes: usize,
    pub stops: usize,
    pub stop_times: usize,
    pub translations_by_record_id: usize,
    pub translations_by_field_value: usize,
}

impl DuplicateCounts {
    pub fn total(&self) -> usize {
        self.trips
            + self.routes
            + self.stops
            + self.stop_times
            + self.translations_by_record_id
            + self.translations_by_field_value
    }
}

/// Stores `value` under `key`, replacing any earlier entry.
///
/// Duplicate keys are resolved last-write-wins: the row parsed last is the one
/// the lookups return. Returns `true` when an earlier entry was replaced.
pub fn insert_last_wins<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, value: V) -> bool {
    map.insert(key, value).is_some()
}

/// Read-only lookups built once per run from a feed's [`ReferenceTables`].
///
/// A missing key is an ordinary outcome, so every accessor returns an `Option`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceIndex {
    trips: HashMap<String, TripRow>,
    routes: HashMap<String, RouteRow>,
    stops: HashMap<String, StopRow>,
    // trip_id -> stop_sequence -> stop_id
    stop_ids: HashMap<String, HashMap<u32, String>>,
    translations_by_record_id: HashMap<String, String>,
    translations_by_field_value: HashMap<String, String>,
    duplicates: DuplicateCounts,
}

impl ReferenceIndex {
    pub fn build(tables: &ReferenceTables) -> Self {
        let mut index = ReferenceIndex::default();
        let dup = &mut index.duplicates;

        for trip in &tables.trips {
            if insert_last_wins(&mut index.trips, trip.trip_id.clone(), trip.clone()) {
                dup.trips += 1;
            }
        }

        for route in &tables.routes {
            if insert_last_wins(&mut index.routes, route.route_id.clone(), route.clone()) {
                dup.routes += 1;
            }
        }

        for stop in &tables.stops {
            if insert_last_wins(&mut index.stops, stop.stop_id.clone(), stop.clone()) {
                dup.stops += 1;
            }
        }

        for st in &tables.stop_times {
            let by_sequence = index.stop_ids.entry(st.trip_id.clone()).or_default();
            if insert_last_wins(by_sequence, st.stop_sequence, st.stop_id.clone()) {
                dup.stop_times += 1;
            }
        }

        for tr in tables.translations.iter().filter(|t| t.language == ENGLISH) {
            if !tr.record_id.is_empty()
                && insert_last_wins(
                    &mut index.translations_by_record_id,
                    tr.record_id.clone(),
                    tr.translation.clone(),
                )
            {
                dup.translations_by_record_id += 1;
            }

            if !tr.field_value.is_empty()
                && insert_last_wins(
                    &mut index.translations_by_field_value,
                    tr.field_value.clone(),
                    tr.translation.clone(),
                )
            {
                dup.translations_by_field_value += 1;
            }
        }

        index
    }

    pub fn trip(&self, trip_id: &str) -> Option<&TripRow> {
        self.trips.get(trip_id)
    }

    pub fn route(&self, route_id: &str) -> Option<&RouteRow> {
        self.routes.get(route_id)
    }

    pub fn stop(&self, stop_id: &str) -> Option<&StopRow> {
        self.stops.get(stop_id)
    }

    /// The stop a trip serves at `stop_sequence`.
    pub fn stop_id_at(&self, trip_id: &str, stop_sequence: u32) -> Option<&str> {
        self.stop_ids
            .get(trip_id)?
            .get(&stop_sequence)
            .map(String::as_str)
    }

    /// English translation whose `record_id` is `record_id`.
    pub fn translation_by_record_id(&self, record_id: &str) -> Option<&str> {
        self.translations_by_record_id
            .get(record_id)
            .map(String::as_str)
    }

    /// English translation whose `field_value` is `value`.
    pub fn translation_by_field_value(&self, value: &str) -> Option<&str> {
        self.translations_by_field_value
            .get(value)
            .map(String::as_str)
    }

    pub fn duplicates(&self) -> DuplicateCounts {
        self.duplicates
    }
}
