//! Joins of a transition against the reference index.
//!
//! These functions only read the index; the engine decides what to do with
//! an `Err`.

use crate::error::ResolveError;
use crate::reference::ReferenceIndex;

use super::types::FeedKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStop {
    pub stop_id: String,
    pub stop_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub route_id: String,
    pub line_name: String,
}

/// Finds the stop `trip_id` serves at `stop_sequence` and its English name.
pub fn resolve_stop(
    index: &ReferenceIndex,
    kind: FeedKind,
    trip_id: &str,
    stop_sequence: u32,
) -> Result<ResolvedStop, ResolveError> {
    let stop_id = index.stop_id_at(trip_id, stop_sequence).ok_or_else(|| {
        ResolveError::UnknownStopSequence {
            trip_id: trip_id.to_string(),
            stop_sequence,
        }
    })?;

    let stop = index
        .stop(stop_id)
        .ok_or_else(|| ResolveError::UnknownStop(stop_id.to_string()))?;

    let translated = match kind {
        FeedKind::Bus => index.translation_by_record_id(stop_id),
        FeedKind::Other => index.translation_by_field_value(&stop.stop_name),
    };

    let stop_name = translated.ok_or_else(|| ResolveError::MissingStopTranslation {
        stop_id: stop_id.to_string(),
        stop_name: stop.stop_name.clone(),
    })?;

    Ok(ResolvedStop {
        stop_id: stop_id.to_string(),
        stop_name: stop_name.to_string(),
    })
}

/// Finds the static route of `trip_id` and its English line name.
///
/// `reported_route_id` is the route id carried by the snapshot; when non-empty
/// it must agree with the trip's static route.
pub fn resolve_line(
    index: &ReferenceIndex,
    kind: FeedKind,
    trip_id: &str,
    reported_route_id: &str,
) -> Result<ResolvedLine, ResolveError> {
    let trip = index
        .trip(trip_id)
        .ok_or_else(|| ResolveError::UnknownTrip(trip_id.to_string()))?;

    if !reported_route_id.is_empty() && reported_route_id != trip.route_id {
        return Err(ResolveError::RouteMismatch {
            reported: reported_route_id.to_string(),
            expected: trip.route_id.clone(),
        });
    }

    let route = index
        .route(&trip.route_id)
        .ok_or_else(|| ResolveError::UnknownRoute(trip.route_id.clone()))?;

    let source = match kind {
        FeedKind::Bus => &trip.trip_headsign,
        FeedKind::Other => &route.route_long_name,
    };

    let line_name = index
        .translation_by_field_value(source)
        .ok_or_else(|| ResolveError::MissingLineTranslation(source.clone()))?;

    Ok(ResolvedLine {
        route_id: route.route_id.clone(),
        line_name: line_name.to_string(),
    })
}
