//! Route lookup
//!
//! The locating engine only ever asks two questions of the route network:
//! "which polylines carry this canonical id" and "which polylines come near
//! this point". [`RouteProvider`] is that capability; [`RouteTable`] is the
//! in-memory implementation used in tests and by callers that load a route
//! network up front. Providers are read-only for the duration of a batch and
//! are shared across worker threads without locking.

use crate::MeasuredPolyline;
use geo::Point;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only access to the route network.
///
/// Candidate ordering is the provider's own and is deliberately a weak
/// guarantee: the engine resolves ambiguous matches by taking the first
/// candidate seen, so callers that need determinism must supply a provider
/// with a deterministic order.
pub trait RouteProvider: Send + Sync {
    /// All polylines indexed under a canonical route id, in provider order.
    fn candidates(&self, route_id: &str) -> Vec<Arc<MeasuredPolyline>>;

    /// Polylines whose envelope comes within `radius` of `point`, in
    /// provider order. Exact distance filtering is the caller's job.
    fn near(&self, point: Point<f64>, radius: f64) -> Vec<Arc<MeasuredPolyline>>;
}

/// In-memory route network keyed by canonical route id.
///
/// Insertion order defines candidate order, both per id and for radius
/// queries.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<MeasuredPolyline>>,
    // Most ids map to exactly one polyline; duplicates are a data-quality
    // anomaly the engine warns about.
    by_id: HashMap<String, SmallVec<[usize; 1]>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a polyline, indexed under its canonical route id.
    pub fn insert(&mut self, route: Arc<MeasuredPolyline>) {
        let index = self.routes.len();
        self.by_id
            .entry(route.route_id().to_string())
            .or_default()
            .push(index);
        self.routes.push(route);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All polylines in insertion order.
    #[inline]
    pub fn routes(&self) -> &[Arc<MeasuredPolyline>] {
        &self.routes
    }
}

impl RouteProvider for RouteTable {
    fn candidates(&self, route_id: &str) -> Vec<Arc<MeasuredPolyline>> {
        self.by_id
            .get(route_id)
            .map(|indices| indices.iter().map(|&i| self.routes[i].clone()).collect())
            .unwrap_or_default()
    }

    fn near(&self, point: Point<f64>, radius: f64) -> Vec<Arc<MeasuredPolyline>> {
        self.routes
            .iter()
            .filter(|route| route.near_bounding_box(point, radius))
            .cloned()
            .collect()
    }
}
