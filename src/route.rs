//! Measured route geometry
//!
//! A [`MeasuredPolyline`] is the read-only geometry of one route: an ordered
//! vertex chain where every vertex carries a measure value that is
//! non-decreasing along the route. Measures are independent of geometric
//! length (mileposts survive realignments), so interpolation always works on
//! the vertex measure spans, never on accumulated distance.

use crate::{LocateError, Result};
use geo::{Closest, ClosestPoint, Coord, Distance, Euclidean, Line, LineString, Point, Rect};
use std::sync::Arc;

/// Immutable route geometry with per-vertex measures.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasuredPolyline {
    /// Canonical route id, as indexed by the provider.
    route_id: String,
    vertices: Vec<Coord<f64>>,
    /// Parallel to `vertices`, monotonically non-decreasing.
    measures: Vec<f64>,
    /// Cached envelope for radius prefiltering.
    bounding_box: Rect<f64>,
}

/// Result of snapping a point onto a route.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectedPoint {
    /// Nearest point on the route.
    pub point: Point<f64>,
    /// Measure at the nearest point, interpolated from vertex measures.
    pub measure: f64,
    /// Planar distance from the input point to the route.
    pub distance: f64,
}

impl MeasuredPolyline {
    /// Build a route from `(position, measure)` vertices.
    ///
    /// Fails when fewer than two vertices are given, when any coordinate or
    /// measure is non-finite, or when measures decrease along the chain.
    pub fn new(
        route_id: impl Into<String>,
        points: Vec<(Coord<f64>, f64)>,
    ) -> Result<Arc<Self>> {
        if points.len() < 2 {
            return Err(LocateError::EmptyRoute);
        }

        let mut vertices = Vec::with_capacity(points.len());
        let mut measures = Vec::with_capacity(points.len());
        let mut min = Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };

        for (index, (coord, measure)) in points.into_iter().enumerate() {
            if !coord.x.is_finite() || !coord.y.is_finite() || !measure.is_finite() {
                return Err(LocateError::InvalidInput(format!(
                    "non-finite coordinate or measure at vertex {index}"
                )));
            }
            if let Some(prev) = measures.last()
                && measure < *prev
            {
                return Err(LocateError::NonMonotonicMeasure { index });
            }
            min.x = min.x.min(coord.x);
            min.y = min.y.min(coord.y);
            max.x = max.x.max(coord.x);
            max.y = max.y.max(coord.y);
            vertices.push(coord);
            measures.push(measure);
        }

        Ok(Arc::new(MeasuredPolyline {
            route_id: route_id.into(),
            vertices,
            measures,
            bounding_box: Rect::new(min, max),
        }))
    }

    /// The canonical route id this geometry belongs to.
    #[inline]
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// First and last measure along the route.
    #[inline]
    pub fn measure_range(&self) -> (f64, f64) {
        (self.measures[0], self.measures[self.measures.len() - 1])
    }

    /// Envelope of the route geometry.
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether `point` lies within `radius` of the route's envelope.
    ///
    /// This is a coarse prefilter; [`MeasuredPolyline::project`] gives the
    /// exact distance.
    pub fn near_bounding_box(&self, point: Point<f64>, radius: f64) -> bool {
        let bb = self.bounding_box;
        point.x() >= bb.min().x - radius
            && point.x() <= bb.max().x + radius
            && point.y() >= bb.min().y - radius
            && point.y() <= bb.max().y + radius
    }

    /// Position on the route at the given measure.
    pub fn point_at_measure(&self, measure: f64) -> Result<Point<f64>> {
        let (min, max) = self.measure_range();
        if !measure.is_finite() || measure < min || measure > max {
            return Err(LocateError::MeasureOutOfRange { measure, min, max });
        }

        for i in 0..self.measures.len() - 1 {
            let (m0, m1) = (self.measures[i], self.measures[i + 1]);
            if measure <= m1 {
                if m1 == m0 {
                    // Flat measure span; any position in it is valid.
                    return Ok(self.vertices[i].into());
                }
                let t = (measure - m0) / (m1 - m0);
                return Ok(lerp(self.vertices[i], self.vertices[i + 1], t).into());
            }
        }

        Ok(self.vertices[self.vertices.len() - 1].into())
    }

    /// Sub-polyline between two measures.
    ///
    /// Vertices are emitted in begin → end order even when `begin_measure >
    /// end_measure`. Equal measures are a degenerate span and fail.
    pub fn segment_between(&self, begin_measure: f64, end_measure: f64) -> Result<LineString<f64>> {
        if begin_measure == end_measure {
            return Err(LocateError::DegenerateGeometry(format!(
                "zero-length span at measure {begin_measure} on route {}",
                self.route_id
            )));
        }

        let lo = begin_measure.min(end_measure);
        let hi = begin_measure.max(end_measure);
        let start = self.point_at_measure(lo)?;
        let end = self.point_at_measure(hi)?;

        let mut coords = vec![Coord::from(start)];
        for (coord, measure) in self.vertices.iter().zip(&self.measures) {
            if *measure > lo && *measure < hi {
                coords.push(*coord);
            }
        }
        coords.push(Coord::from(end));

        if begin_measure > end_measure {
            coords.reverse();
        }
        Ok(LineString::new(coords))
    }

    /// Snap a point onto the route, returning the nearest position, its
    /// interpolated measure, and the planar distance to it.
    pub fn project(&self, point: Point<f64>) -> ProjectedPoint {
        let mut best = self.project_onto_edge(0, point);
        for i in 1..self.vertices.len() - 1 {
            let candidate = self.project_onto_edge(i, point);
            if candidate.distance < best.distance {
                best = candidate;
            }
        }
        best
    }

    fn project_onto_edge(&self, i: usize, point: Point<f64>) -> ProjectedPoint {
        let (a, b) = (self.vertices[i], self.vertices[i + 1]);
        let snapped = match Line::new(a, b).closest_point(&point) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => p,
            // Zero-length edge; its start is the only candidate.
            Closest::Indeterminate => Point::from(a),
        };

        let edge_length = Euclidean.distance(Point::from(a), Point::from(b));
        let t = if edge_length > 0.0 {
            Euclidean.distance(Point::from(a), snapped) / edge_length
        } else {
            0.0
        };

        ProjectedPoint {
            point: snapped,
            measure: self.measures[i] + t * (self.measures[i + 1] - self.measures[i]),
            distance: Euclidean.distance(point, snapped),
        }
    }
}

#[inline]
fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}
