//! Pipeline orchestrator.
//!
//! An iteration walks an ordered list of `StageDescriptor`s. Each stage
//! organizes its input as of `calc_time` and hands the result to its handler
//! before the next stage starts. A stage's optional exit predicate can end the
//! iteration early; the first collaborator error ends it with
//! `RoutefinderError::StageFailed`.

pub mod domain;
pub mod stage;

#[cfg(test)]
pub(crate) mod recording;

pub use domain::{Classification, Document, Handlers, IdleDomain, Organizer};
pub use stage::{IterationContext, StageDescriptor, StageKind, StageOutput};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, RoutefinderError};

/// Routes computed by the standard pipeline are simulated, not committed.
pub const PROVISIONAL_ROUTES: bool = true;

/// Counts for one stage that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub stage: StageKind,
    pub accepted: usize,
    pub rejected: usize,
}

/// What a completed iteration did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationReport {
    pub calc_time: DateTime<Utc>,
    pub stages: Vec<StageSummary>,
    /// Stage whose exit predicate cut the iteration short.
    pub early_exit_after: Option<StageKind>,
}

impl IterationReport {
    pub fn ran(&self, kind: StageKind) -> bool {
        self.stages.iter().any(|s| s.stage == kind)
    }
}

#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<StageDescriptor>,
}

impl Pipeline {
    pub fn new(stages: Vec<StageDescriptor>) -> Self {
        Self { stages }
    }

    /// Reservations → sales → (exit when there is no demand) → drivers → routes.
    pub fn standard(organizer: Arc<dyn Organizer>, handlers: Arc<dyn Handlers>) -> Self {
        let reservations = {
            let (o, h) = (organizer.clone(), handlers.clone());
            StageDescriptor::new(
                StageKind::Reservations,
                move |t| o.organize_reserved_sales(t).map(StageOutput::Classified),
                move |out, t| h.handle_reservations(out.accepted(), out.rejected(), t),
            )
        };
        let sales = {
            let (o, h) = (organizer.clone(), handlers.clone());
            StageDescriptor::new(
                StageKind::Sales,
                move |t| o.organize_ordinary_sales(t).map(StageOutput::Classified),
                move |out, t| h.handle_sales(out.accepted(), out.rejected(), t),
            )
            .exit_after(|ctx| ctx.demand().is_empty())
        };
        let drivers = {
            let (o, h) = (organizer.clone(), handlers.clone());
            StageDescriptor::new(
                StageKind::Drivers,
                move |t| o.organize_drivers(t).map(StageOutput::Classified),
                move |out, t| h.handle_drives(out.accepted(), out.rejected(), t),
            )
        };
        let routes = StageDescriptor::new(
            StageKind::Routes,
            move |t| organizer.organize_routes(t).map(StageOutput::Routes),
            move |out, t| handlers.handle_routes(out.accepted(), t, PROVISIONAL_ROUTES),
        );
        Self::new(vec![reservations, sales, drivers, routes])
    }

    pub fn stages(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.stages.iter().map(StageDescriptor::kind)
    }

    pub fn run_iteration(&self, calc_time: DateTime<Utc>) -> Result<IterationReport> {
        let mut ctx = IterationContext::new(calc_time);
        let mut report = IterationReport {
            calc_time,
            stages: Vec::with_capacity(self.stages.len()),
            early_exit_after: None,
        };

        for stage in &self.stages {
            let output = (stage.organize)(calc_time).map_err(|e| stage_failed(stage.kind, e))?;
            (stage.handle)(&output, calc_time).map_err(|e| stage_failed(stage.kind, e))?;

            let summary = StageSummary {
                stage: stage.kind,
                accepted: output.accepted().len(),
                rejected: output.rejected().len(),
            };
            tracing::debug!(
                stage = %summary.stage,
                accepted = summary.accepted,
                rejected = summary.rejected,
                "stage complete"
            );
            report.stages.push(summary);
            ctx.record(stage.kind, output);

            if stage.exit_after.as_ref().is_some_and(|exit| exit(&ctx)) {
                tracing::info!(stage = %stage.kind, "nothing left to compute, skipping remaining stages");
                report.early_exit_after = Some(stage.kind);
                break;
            }
        }

        Ok(report)
    }
}

fn stage_failed(stage: StageKind, e: anyhow::Error) -> RoutefinderError {
    RoutefinderError::StageFailed {
        stage,
        reason: format!("{e:#}"),
    }
}
