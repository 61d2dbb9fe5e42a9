//! Point pairing and segment reconciliation
//!
//! A flat, ordered point sequence encodes line segments by parity: even rows
//! are begin points, odd rows are end points, and `segment_id = index / 2`.
//! Each point is snapped to the nearest route within a search radius; pairs
//! whose endpoints resolve to different routes (or to none) do not lie
//! wholly on one indexed route and are discarded, counted rather than
//! raised.

use crate::event::round_output;
use crate::route::ProjectedPoint;
use crate::{
    EventLocator, LocateError, LocatedGeometry, LocatedResult, MeasuredPolyline, Result,
    RouteProvider,
};
use geo::Point;
use rayon::prelude::*;
use std::sync::Arc;

/// A reconciled begin/end pair on a single route.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentPair {
    /// Index of the pair in the input sequence (`input index / 2`).
    pub segment_id: usize,
    /// Canonical id of the route both endpoints snapped to.
    pub route_id: String,
    pub begin_measure: f64,
    pub end_measure: f64,
    /// Snap distance of the begin point.
    pub begin_distance: f64,
    /// Snap distance of the end point.
    pub end_distance: f64,
}

/// A surviving pair plus its located geometry.
///
/// The result's `source_row_id` is the pair's `segment_id`. A pair whose
/// endpoints project to the same measure keeps its row with a degenerate
/// geometry error rather than being discarded; it did pass reconciliation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairedSegment {
    pub segment: SegmentPair,
    pub result: LocatedResult,
}

/// Aggregate counts for one pairing run, reported instead of raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairingSummary {
    /// Pairs formed from the input (`len / 2`).
    pub pair_count: usize,
    /// Pairs dropped because their endpoints matched different routes or no
    /// route at all.
    pub discarded: usize,
}

/// Surviving segments plus summary for one pairing run.
#[derive(Debug, Clone)]
pub struct PairingOutcome {
    pub segments: Vec<PairedSegment>,
    pub summary: PairingSummary,
}

/// One point's best route match within the search radius.
struct PointMatch {
    route: Arc<MeasuredPolyline>,
    projected: ProjectedPoint,
}

impl<P: RouteProvider> EventLocator<P> {
    /// Pair an ordered point sequence into begin/end segments and locate
    /// each surviving pair along its route.
    ///
    /// The input length must be even; an odd count fails the whole call with
    /// [`LocateError::InvalidInput`] before any point is processed. This is
    /// the engine's only call-level failure.
    pub fn pair_and_locate(
        &self,
        points: &[Point<f64>],
        search_radius: f64,
    ) -> Result<PairingOutcome> {
        if points.len() % 2 != 0 {
            return Err(LocateError::InvalidInput(format!(
                "point sequence must hold begin/end pairs, got {} points",
                points.len()
            )));
        }

        // Segment ids derive from input position, so they are fixed before
        // the parallel fan-out and survive any scheduling order.
        let matches: Vec<Option<PointMatch>> = points
            .par_iter()
            .map(|&point| self.nearest_route_match(point, search_radius))
            .collect();

        let digits = self.config().rounding_digits;
        let mut segments = Vec::new();
        let mut discarded = 0usize;

        for (segment_id, pair) in matches.chunks(2).enumerate() {
            let (Some(begin), Some(end)) = (&pair[0], &pair[1]) else {
                discarded += 1;
                tracing::debug!(segment_id, "discarding pair: no route within search radius");
                continue;
            };
            if begin.route.route_id() != end.route.route_id() {
                discarded += 1;
                tracing::debug!(
                    segment_id,
                    begin = %begin.route.route_id(),
                    end = %end.route.route_id(),
                    "discarding pair: endpoints matched different routes"
                );
                continue;
            }

            let segment = SegmentPair {
                segment_id,
                route_id: begin.route.route_id().to_string(),
                begin_measure: round_output(begin.projected.measure, digits),
                end_measure: round_output(end.projected.measure, digits),
                begin_distance: round_output(begin.projected.distance, digits),
                end_distance: round_output(end.projected.distance, digits),
            };
            let result =
                match begin
                    .route
                    .segment_between(begin.projected.measure, end.projected.measure)
                {
                    Ok(line) => LocatedResult {
                        source_row_id: segment_id as i64,
                        route_id: Some(segment.route_id.clone()),
                        geometry: Some(LocatedGeometry::Line(line)),
                        measure: Some(segment.begin_measure),
                        end_measure: Some(segment.end_measure),
                        distance_from_route: Some(segment.begin_distance),
                        end_distance_from_route: Some(segment.end_distance),
                        ..Default::default()
                    },
                    Err(err) => {
                        tracing::warn!(segment_id, %err, "failed to build segment geometry");
                        LocatedResult::failure(segment_id as i64, &err)
                    }
                };
            segments.push(PairedSegment { segment, result });
        }

        Ok(PairingOutcome {
            summary: PairingSummary {
                pair_count: points.len() / 2,
                discarded,
            },
            segments,
        })
    }

    /// Nearest route to `point` among those within `search_radius`, ties
    /// broken by provider candidate order.
    fn nearest_route_match(&self, point: Point<f64>, search_radius: f64) -> Option<PointMatch> {
        let mut best: Option<PointMatch> = None;
        for route in self.provider().near(point, search_radius) {
            let projected = route.project(point);
            if projected.distance > search_radius {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|b| projected.distance < b.projected.distance)
            {
                best = Some(PointMatch { route, projected });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocatorConfig, RouteTable};
    use geo::Coord;

    fn flat_route(route_id: &str, y: f64) -> Arc<MeasuredPolyline> {
        MeasuredPolyline::new(
            route_id,
            vec![(Coord { x: 0.0, y }, 0.0), (Coord { x: 100.0, y }, 100.0)],
        )
        .unwrap()
    }

    fn test_locator() -> EventLocator<RouteTable> {
        let mut table = RouteTable::new();
        table.insert(flat_route("005i", 0.0));
        table.insert(flat_route("002i", 50.0));
        EventLocator::new(table, LocatorConfig::default())
    }

    #[test]
    fn test_pairs_survive_and_mismatches_discard() {
        let locator = test_locator();
        let points = vec![
            // Pair 0: both endpoints near route 005i.
            Point::new(10.0, 1.0),
            Point::new(20.0, 1.0),
            // Pair 1: begin near 002i, end near 005i.
            Point::new(10.0, 49.0),
            Point::new(20.0, 1.0),
        ];

        let outcome = locator.pair_and_locate(&points, 5.0).unwrap();
        assert_eq!(outcome.summary.pair_count, 2);
        assert_eq!(outcome.summary.discarded, 1);
        assert_eq!(outcome.segments.len(), 1);

        let paired = &outcome.segments[0];
        assert_eq!(paired.segment.segment_id, 0);
        assert_eq!(paired.segment.route_id, "005i");
        assert!((paired.segment.begin_measure - 10.0).abs() < 1e-9);
        assert!((paired.segment.end_measure - 20.0).abs() < 1e-9);
        assert!((paired.segment.begin_distance - 1.0).abs() < 1e-9);
        assert_eq!(paired.result.source_row_id, 0);
        assert!(paired.result.is_located());
    }

    #[test]
    fn test_odd_point_count_fails_whole_call() {
        let locator = test_locator();
        let points = vec![
            Point::new(10.0, 1.0),
            Point::new(20.0, 1.0),
            Point::new(30.0, 1.0),
        ];

        match locator.pair_and_locate(&points, 5.0) {
            Err(LocateError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_point_without_route_discards_its_pair() {
        let locator = test_locator();
        let points = vec![Point::new(10.0, 200.0), Point::new(20.0, 1.0)];

        let outcome = locator.pair_and_locate(&points, 5.0).unwrap();
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.summary.pair_count, 1);
        assert_eq!(outcome.summary.discarded, 1);
    }

    #[test]
    fn test_tied_distances_break_to_first_candidate() {
        let mut table = RouteTable::new();
        // Two coincident routes; insertion order decides.
        table.insert(flat_route("004i", 10.0));
        table.insert(flat_route("003i", 10.0));
        let locator = EventLocator::new(table, LocatorConfig::default());

        let points = vec![Point::new(10.0, 10.0), Point::new(20.0, 10.0)];
        let outcome = locator.pair_and_locate(&points, 5.0).unwrap();

        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].segment.route_id, "004i");
    }

    #[test]
    fn test_coincident_endpoints_keep_row_with_error() {
        let locator = test_locator();
        // Both points project to measure 10 on 005i.
        let points = vec![Point::new(10.0, 1.0), Point::new(10.0, 2.0)];

        let outcome = locator.pair_and_locate(&points, 5.0).unwrap();
        assert_eq!(outcome.summary.discarded, 0);
        assert_eq!(outcome.segments.len(), 1);

        let paired = &outcome.segments[0];
        assert!(paired.result.geometry.is_none());
        let error = paired.result.error.as_deref().unwrap();
        assert!(error.contains("degenerate"), "unexpected error: {error}");
    }

    #[test]
    fn test_empty_input_is_valid() {
        let locator = test_locator();
        let outcome = locator.pair_and_locate(&[], 5.0).unwrap();
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.summary.pair_count, 0);
        assert_eq!(outcome.summary.discarded, 0);
    }
}
