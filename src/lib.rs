//! Route Locator - Linear-Referencing Event Location
//!
//! This library places tabular "events" (points or begin/end line segments,
//! identified by a route id and one or two measure values) onto a network of
//! measured route polylines, producing geometry plus per-row diagnostics.
//!
//! # Architecture
//!
//! - **[`RouteId`]**: grammar and normalizer for human-entered route ids
//! - **[`MeasuredPolyline`]**: immutable route geometry with per-vertex measures
//! - **[`RouteProvider`]** / **[`RouteTable`]**: route lookup by canonical id
//!   or by proximity
//! - **[`EventLocator`]**: converts one event into one [`LocatedResult`] by
//!   measure interpolation or nearest-point projection
//! - **[`EventLocator::pair_and_locate`]**: pairs a flat point sequence into
//!   begin/end segments and rejects pairs that snap to different routes
//!
//! # Error model
//!
//! Row-level problems (malformed ids, missing routes, out-of-range measures)
//! are captured in the affected row's [`LocatedResult`] and never abort a
//! batch; only call-level precondition violations ([`LocateError::InvalidInput`])
//! fail a whole operation, and they do so before any row work begins.

mod engine;
mod event;
mod provider;
mod route;
mod route_id;
mod segments;

// Public API exports
pub use engine::{BatchOutcome, BatchSummary, CancelToken, EventLocator, LocatorConfig};
pub use event::{Event, EventGeometry, EventKind, LocatedGeometry, LocatedResult};
pub use provider::{RouteProvider, RouteTable};
pub use route::{MeasuredPolyline, ProjectedPoint};
pub use route_id::{
    Direction, RouteId, SuffixPolicy, standardize_route_id, standardize_with_direction,
};
pub use segments::{PairedSegment, PairingOutcome, PairingSummary, SegmentPair};

/// Error types for event location
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("invalid route id: {0}")]
    MalformedRouteId(String),

    #[error("route not found: {0}")]
    RouteNotFound(String),

    #[error("measure {measure} is outside route measures {min}..{max}")]
    MeasureOutOfRange { measure: f64, min: f64, max: f64 },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("event geometry is null")]
    NullGeometry,

    #[error("a measured polyline needs at least two vertices")]
    EmptyRoute,

    #[error("route measures must be non-decreasing (vertex {index})")]
    NonMonotonicMeasure { index: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LocateError {
    /// Whether this error is fatal to the whole call rather than to one row.
    pub fn is_call_level(&self) -> bool {
        matches!(self, LocateError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, LocateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(LocateError::InvalidInput("odd point count".into()).is_call_level());
        assert!(!LocateError::RouteNotFound("005i".into()).is_call_level());
        assert!(!LocateError::MalformedRouteId("bogus".into()).is_call_level());
    }

    #[test]
    fn test_error_display() {
        let err = LocateError::MalformedRouteId("hello".into());
        assert_eq!(err.to_string(), "invalid route id: hello");

        let err = LocateError::MeasureOutOfRange {
            measure: 500.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(err.to_string(), "measure 500 is outside route measures 0..100");
    }
}
