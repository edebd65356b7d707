//! Lazy sweeps over operating conditions
//!
//! A sweep yields one [`SweepItem`] per condition, in order. A failed
//! point is reported (log and trace) and the sweep moves on; once the
//! cancellation token is set every remaining point comes back as
//! `Err(Cancelled)` without any work. All points run on one worker pool,
//! built with the sweep.

use serde::Serialize;
use std::sync::Arc;

use super::cancel::CancellationToken;
use super::condition::OperatingCondition;
use super::result::OperatingPointResult;
use super::task::{AnalysisTask, PreparedSystem};
use crate::core::config::SolverConfig;
use crate::core::error::AnalysisError;
use crate::core::mesh::PanelMesh;
use crate::core::parallel::WorkerPool;
use crate::core::trace::TraceSink;
use crate::core::viscous::PolarProvider;

/// Outcome of one point
#[derive(Debug)]
pub struct SweepItem {
    /// Position in the sweep
    pub index: usize,
    /// Requested condition
    pub condition: OperatingCondition,
    /// Result or the reason the point was discarded
    pub result: Result<OperatingPointResult, AnalysisError>,
}

/// Iterator running one point per `next` call
pub struct Sweep<'a> {
    mesh: &'a PanelMesh,
    conditions: std::iter::Enumerate<std::vec::IntoIter<OperatingCondition>>,
    config: &'a SolverConfig,
    polars: &'a dyn PolarProvider,
    trace: &'a dyn TraceSink,
    cancel: &'a CancellationToken,
    cache: Option<Arc<PreparedSystem>>,
    pool: WorkerPool,
}

/// Sweep `conditions` lazily
pub fn run_sweep<'a>(
    mesh: &'a PanelMesh,
    conditions: Vec<OperatingCondition>,
    config: &'a SolverConfig,
    polars: &'a dyn PolarProvider,
    trace: &'a dyn TraceSink,
    cancel: &'a CancellationToken,
) -> Sweep<'a> {
    log::info!("sweep over {} operating points", conditions.len());
    Sweep {
        mesh,
        conditions: conditions.into_iter().enumerate(),
        config,
        polars,
        trace,
        cancel,
        cache: None,
        pool: WorkerPool::new(config.threads),
    }
}

impl Iterator for Sweep<'_> {
    type Item = SweepItem;

    fn next(&mut self) -> Option<SweepItem> {
        let (index, condition) = self.conditions.next()?;
        if self.cancel.is_cancelled() {
            return Some(SweepItem {
                index,
                condition,
                result: Err(AnalysisError::Cancelled),
            });
        }

        let Self {
            mesh,
            config,
            polars,
            trace,
            cancel,
            cache,
            pool,
            ..
        } = self;
        let (mesh, config, polars, trace, cancel) = (*mesh, *config, *polars, *trace, *cancel);
        let result = pool.install(|| {
            AnalysisTask::new(mesh, condition.clone(), config, polars, trace, cancel)
                .with_label(format!("point {index}"))
                .run(cache)
        });
        if let Err(e) = &result
            && !e.is_cancellation()
        {
            log::warn!("point {index} discarded: {e}");
            trace.line(&format!("point {index} discarded: {e}"));
        }
        Some(SweepItem {
            index,
            condition,
            result,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.conditions.size_hint()
    }
}

/// Point that produced no result
#[derive(Debug, Clone, Serialize)]
pub struct DiscardedPoint {
    /// Position in the sweep
    pub index: usize,
    /// Error message
    pub reason: String,
}

/// Collected outcome of a sweep
#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    /// Completed points with their sweep index
    pub results: Vec<(usize, OperatingPointResult)>,
    /// Failed points
    pub discarded: Vec<DiscardedPoint>,
    /// Points skipped by a cancellation
    pub cancelled: usize,
}

impl SweepSummary {
    /// Drain a sweep
    pub fn collect<I: IntoIterator<Item = SweepItem>>(items: I) -> Self {
        items.into_iter().collect()
    }

    /// Number of completed points
    pub fn completed(&self) -> usize {
        self.results.len()
    }
}

impl FromIterator<SweepItem> for SweepSummary {
    fn from_iter<I: IntoIterator<Item = SweepItem>>(iter: I) -> Self {
        let mut summary = SweepSummary::default();
        for item in iter {
            match item.result {
                Ok(result) => summary.results.push((item.index, result)),
                Err(AnalysisError::Cancelled) => summary.cancelled += 1,
                Err(e) => summary.discarded.push(DiscardedPoint {
                    index: item.index,
                    reason: e.to_string(),
                }),
            }
        }
        summary
    }
}
