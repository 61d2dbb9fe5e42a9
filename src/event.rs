//! Event and result records
//!
//! One [`Event`] in, one [`LocatedResult`] out. Results are built once and
//! never mutated; a failed row carries its error text instead of geometry,
//! so a batch is always complete even when individual rows fail.

use crate::LocateError;
use geo::{LineString, Point};

/// An input record to be placed onto a route.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Row id from the source table, echoed into the result.
    pub source_row_id: i64,
    /// Route id exactly as entered; normalized during locating.
    pub route_id: String,
    pub kind: EventKind,
}

/// What an event describes. Exactly one kind per event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// A position known by measure.
    Point { measure: f64 },
    /// A span known by begin/end measures.
    Segment {
        begin_measure: f64,
        end_measure: f64,
    },
    /// Raw geometry with no known measure; located by projection.
    Unmeasured { geometry: EventGeometry },
}

/// Raw geometry carried by an unmeasured event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventGeometry {
    Point(Point<f64>),
    /// Only the first and last vertices participate in projection.
    Path(LineString<f64>),
}

/// Geometry produced for a located event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocatedGeometry {
    Point(Point<f64>),
    Line(LineString<f64>),
}

/// Per-row output of the locating engine.
///
/// Exactly one of `geometry` and `error` is set. Measure and distance fields
/// are filled where the locating path produces them, after output rounding.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocatedResult {
    pub source_row_id: i64,
    /// Canonical id of the matched route, when one was found.
    pub route_id: Option<String>,
    pub geometry: Option<LocatedGeometry>,
    pub error: Option<String>,
    pub measure: Option<f64>,
    pub end_measure: Option<f64>,
    pub distance_from_route: Option<f64>,
    pub end_distance_from_route: Option<f64>,
}

impl Event {
    pub fn point(source_row_id: i64, route_id: impl Into<String>, measure: f64) -> Self {
        Event {
            source_row_id,
            route_id: route_id.into(),
            kind: EventKind::Point { measure },
        }
    }

    pub fn segment(
        source_row_id: i64,
        route_id: impl Into<String>,
        begin_measure: f64,
        end_measure: f64,
    ) -> Self {
        Event {
            source_row_id,
            route_id: route_id.into(),
            kind: EventKind::Segment {
                begin_measure,
                end_measure,
            },
        }
    }

    pub fn unmeasured(
        source_row_id: i64,
        route_id: impl Into<String>,
        geometry: EventGeometry,
    ) -> Self {
        Event {
            source_row_id,
            route_id: route_id.into(),
            kind: EventKind::Unmeasured { geometry },
        }
    }
}

impl LocatedResult {
    /// A row that failed to locate; carries the error text, no geometry.
    pub(crate) fn failure(source_row_id: i64, error: &LocateError) -> Self {
        LocatedResult {
            source_row_id,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Whether the row produced geometry.
    #[inline]
    pub fn is_located(&self) -> bool {
        self.geometry.is_some()
    }
}

/// Round to `digits` decimals when requested; output fields only, never
/// intermediate computation.
pub(crate) fn round_output(value: f64, digits: Option<i32>) -> f64 {
    match digits {
        Some(digits) => {
            let factor = 10f64.powi(digits);
            (value * factor).round() / factor
        }
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_has_error_and_no_geometry() {
        let row = LocatedResult::failure(7, &LocateError::RouteNotFound("005i".into()));
        assert_eq!(row.source_row_id, 7);
        assert!(!row.is_located());
        assert_eq!(row.error.as_deref(), Some("route not found: 005i"));
        assert!(row.measure.is_none());
    }

    #[test]
    fn test_round_output() {
        assert_eq!(round_output(1.23456, Some(2)), 1.23);
        assert_eq!(round_output(2.5, Some(0)), 3.0);
        assert_eq!(round_output(-2.5, Some(0)), -3.0);
        assert_eq!(round_output(1.23456, None), 1.23456);
    }
}
