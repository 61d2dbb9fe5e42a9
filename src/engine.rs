//! Linear-referencing engine
//!
//! [`EventLocator`] converts one [`Event`] into one [`LocatedResult`]:
//! measure-carrying events by interpolation along the identified route,
//! unmeasured events by nearest-point projection onto it. Every per-row
//! failure is folded into the row's own result; a batch never aborts on bad
//! data.
//!
//! Rows are independent and the provider is read-only during a batch, so
//! [`EventLocator::locate_batch`] fans rows out across a rayon worker pool.
//! Cancellation is cooperative and coarse-grained: the flag is checked
//! between rows, never mid-row, and a cancelled run still returns everything
//! computed so far.

use crate::event::round_output;
use crate::route_id::standardize_route_id;
use crate::{
    Event, EventGeometry, EventKind, LocateError, LocatedGeometry, LocatedResult,
    MeasuredPolyline, Result, RouteProvider, SuffixPolicy,
};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Engine configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocatorConfig {
    /// Suffix convention of the route network's ids; raw event ids are
    /// standardized under this policy to build lookup keys.
    pub suffix_policy: SuffixPolicy,
    /// Round output measures and distances to this many decimals.
    /// Intermediate computation is never rounded.
    pub rounding_digits: Option<i32>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            suffix_policy: SuffixPolicy::Either,
            rounding_digits: None,
        }
    }
}

/// Batch-level cancellation flag, shared across worker threads.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; rows not yet started are skipped.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Aggregate counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchSummary {
    /// Rows in the input.
    pub total: usize,
    /// Rows that produced geometry.
    pub located: usize,
    /// Rows that produced an error instead.
    pub errored: usize,
    /// Rows skipped because the batch was cancelled.
    pub unprocessed: usize,
}

/// Results plus summary for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One result per processed row, in input order.
    pub results: Vec<LocatedResult>,
    pub summary: BatchSummary,
}

/// Locates events along a route network served by `P`.
pub struct EventLocator<P> {
    provider: P,
    config: LocatorConfig,
}

impl<P: RouteProvider> EventLocator<P> {
    pub fn new(provider: P, config: LocatorConfig) -> Self {
        Self { provider, config }
    }

    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[inline]
    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locate one event. Never fails: per-row problems become the result's
    /// `error` field.
    pub fn locate(&self, event: &Event) -> LocatedResult {
        match self.try_locate(event) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    row = event.source_row_id,
                    route = %event.route_id,
                    %err,
                    "failed to locate event"
                );
                LocatedResult::failure(event.source_row_id, &err)
            }
        }
    }

    /// Locate events one at a time from a sequential row source.
    ///
    /// Each yielded result corresponds to the next input row. Use this when
    /// the source or sink is latency-bound and rows should stream through;
    /// [`EventLocator::locate_batch`] is the parallel alternative for
    /// in-memory batches.
    pub fn locate_stream<'a, I>(&'a self, events: I) -> impl Iterator<Item = LocatedResult> + 'a
    where
        I: IntoIterator<Item = &'a Event>,
        I::IntoIter: 'a,
    {
        events.into_iter().map(|event| self.locate(event))
    }

    /// Locate a batch of events in parallel.
    ///
    /// Output order matches input order for the rows that ran; cancelled
    /// rows are dropped from `results` and counted in the summary.
    pub fn locate_batch(&self, events: &[Event], cancel: &CancelToken) -> BatchOutcome {
        let rows: Vec<Option<LocatedResult>> = events
            .par_iter()
            .map(|event| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.locate(event))
            })
            .collect();

        let total = events.len();
        let unprocessed = rows.iter().filter(|row| row.is_none()).count();
        let results: Vec<LocatedResult> = rows.into_iter().flatten().collect();
        let errored = results.iter().filter(|row| row.error.is_some()).count();

        if errored > 0 {
            tracing::warn!(errored, total, "unable to locate some events");
        }

        BatchOutcome {
            summary: BatchSummary {
                total,
                located: results.len() - errored,
                errored,
                unprocessed,
            },
            results,
        }
    }

    fn try_locate(&self, event: &Event) -> Result<LocatedResult> {
        let key = standardize_route_id(&event.route_id, self.config.suffix_policy)?;
        let candidates = self.provider.candidates(&key);
        let Some(route) = candidates.first() else {
            return Err(LocateError::RouteNotFound(key));
        };
        if candidates.len() > 1 {
            // Data-quality anomaly; ties break to the first candidate seen.
            tracing::warn!(
                route = %key,
                candidates = candidates.len(),
                "route id matches multiple polylines; using the first"
            );
        }

        match &event.kind {
            EventKind::Point { measure } => self.locate_point(event, key, route, *measure),
            EventKind::Segment {
                begin_measure,
                end_measure,
            } => self.locate_segment(event, key, route, *begin_measure, *end_measure),
            EventKind::Unmeasured { geometry } => {
                self.locate_by_projection(event, key, route, geometry)
            }
        }
    }

    fn locate_point(
        &self,
        event: &Event,
        key: String,
        route: &Arc<MeasuredPolyline>,
        measure: f64,
    ) -> Result<LocatedResult> {
        let digits = self.config.rounding_digits;
        let point = route.point_at_measure(measure)?;
        Ok(LocatedResult {
            source_row_id: event.source_row_id,
            route_id: Some(key),
            geometry: Some(LocatedGeometry::Point(point)),
            measure: Some(round_output(measure, digits)),
            ..Default::default()
        })
    }

    fn locate_segment(
        &self,
        event: &Event,
        key: String,
        route: &Arc<MeasuredPolyline>,
        begin_measure: f64,
        end_measure: f64,
    ) -> Result<LocatedResult> {
        let digits = self.config.rounding_digits;
        let line = route.segment_between(begin_measure, end_measure)?;
        Ok(LocatedResult {
            source_row_id: event.source_row_id,
            route_id: Some(key),
            geometry: Some(LocatedGeometry::Line(line)),
            measure: Some(round_output(begin_measure, digits)),
            end_measure: Some(round_output(end_measure, digits)),
            ..Default::default()
        })
    }

    fn locate_by_projection(
        &self,
        event: &Event,
        key: String,
        route: &Arc<MeasuredPolyline>,
        geometry: &EventGeometry,
    ) -> Result<LocatedResult> {
        let digits = self.config.rounding_digits;
        match geometry {
            EventGeometry::Point(point) => {
                let projected = route.project(*point);
                Ok(LocatedResult {
                    source_row_id: event.source_row_id,
                    route_id: Some(key),
                    geometry: Some(LocatedGeometry::Point(projected.point)),
                    measure: Some(round_output(projected.measure, digits)),
                    distance_from_route: Some(round_output(projected.distance, digits)),
                    ..Default::default()
                })
            }
            EventGeometry::Path(path) => {
                let first = path.0.first().ok_or(LocateError::NullGeometry)?;
                let last = path.0.last().ok_or(LocateError::NullGeometry)?;
                let begin = route.project((*first).into());
                let end = route.project((*last).into());
                // First point's measure leads, even when decreasing.
                let line = route.segment_between(begin.measure, end.measure)?;
                Ok(LocatedResult {
                    source_row_id: event.source_row_id,
                    route_id: Some(key),
                    geometry: Some(LocatedGeometry::Line(line)),
                    measure: Some(round_output(begin.measure, digits)),
                    end_measure: Some(round_output(end.measure, digits)),
                    distance_from_route: Some(round_output(begin.distance, digits)),
                    end_distance_from_route: Some(round_output(end.distance, digits)),
                    ..Default::default()
                })
            }
        }
    }
}
