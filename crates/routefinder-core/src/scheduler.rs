//! Scheduler: the single background worker that decides and runs iterations.
//!
//! The worker is an explicit state machine:
//!
//! ```text
//! Idle → Evaluating ─┬─ not triggered / store error ──────────────→ Idle
//!                    └─ triggered → Running → Persisting ─────────→ Idle
//! ```
//!
//! `advance` performs exactly one transition, `run_pass` drives a full pass
//! back to `Idle`, and `run` repeats passes with the poll interval between
//! them until the shutdown signal fires. The poll timer belongs to `run`, so
//! tests can single-step without sleeping.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::clock::{Clock, SystemClock};
use crate::config::{DirtyClearPolicy, SchedulerConfig};
use crate::guide::{Guide, GuideStore};
use crate::pipeline::{IterationReport, Pipeline};
use crate::trigger::{TriggerEvaluator, TriggerReason};

/// How the iteration of the current pass ended.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    Completed(IterationReport),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerState {
    Idle,
    Evaluating,
    Running {
        guide: Guide,
        reason: TriggerReason,
        calc_time: DateTime<Utc>,
    },
    Persisting {
        guide: Guide,
        reason: TriggerReason,
        outcome: IterationOutcome,
    },
}

/// Result of one full pass, returned when the machine is back in `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum PassReport {
    /// Nothing to do: off-season or up to date.
    Skipped(TriggerReason),
    Completed {
        reason: TriggerReason,
        report: IterationReport,
        saved: DateTime<Utc>,
    },
    /// The iteration failed. `saved` is the persisted stamp, if any.
    Failed {
        reason: TriggerReason,
        error: String,
        saved: Option<DateTime<Utc>>,
    },
    /// The guide store could not be read or written; nothing was persisted.
    StoreUnavailable(String),
    /// A collaborator panicked; the pass was abandoned.
    Panicked(String),
}

pub struct Scheduler {
    trigger: TriggerEvaluator,
    pipeline: Arc<Pipeline>,
    store: Arc<dyn GuideStore>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(store: Arc<dyn GuideStore>, pipeline: Pipeline, config: SchedulerConfig) -> Self {
        Self {
            trigger: TriggerEvaluator::new(store.clone(), &config),
            pipeline: Arc::new(pipeline),
            store,
            clock: Arc::new(SystemClock),
            config,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Perform one state transition. Returns the pass report when the
    /// transition lands back in `Idle`.
    pub fn advance(&mut self) -> Option<PassReport> {
        let (next, report) = match std::mem::replace(&mut self.state, SchedulerState::Idle) {
            SchedulerState::Idle => (SchedulerState::Evaluating, None),
            SchedulerState::Evaluating => self.evaluate(),
            SchedulerState::Running {
                guide,
                reason,
                calc_time,
            } => (self.iterate(guide, reason, calc_time), None),
            SchedulerState::Persisting {
                guide,
                reason,
                outcome,
            } => (SchedulerState::Idle, Some(self.persist(guide, reason, outcome))),
        };
        self.state = next;
        report
    }

    /// Drive the machine from its current state until the pass completes.
    pub fn run_pass(&mut self) -> PassReport {
        loop {
            if let Some(report) = self.advance() {
                return report;
            }
        }
    }

    fn evaluate(&self) -> (SchedulerState, Option<PassReport>) {
        let now = self.clock.now();
        match self.trigger.should_trigger(now) {
            Err(e) => (
                SchedulerState::Idle,
                Some(PassReport::StoreUnavailable(e.to_string())),
            ),
            Ok(decision) if !decision.triggered() => (
                SchedulerState::Idle,
                Some(PassReport::Skipped(decision.reason)),
            ),
            Ok(decision) => {
                tracing::info!(reason = %decision.reason, calc_time = %now, "new iteration triggered");
                (
                    SchedulerState::Running {
                        guide: decision.guide,
                        reason: decision.reason,
                        calc_time: now,
                    },
                    None,
                )
            }
        }
    }

    fn iterate(
        &self,
        guide: Guide,
        reason: TriggerReason,
        calc_time: DateTime<Utc>,
    ) -> SchedulerState {
        let outcome = match self.pipeline.run_iteration(calc_time) {
            Ok(report) => {
                tracing::info!(
                    stages = report.stages.len(),
                    early_exit = ?report.early_exit_after,
                    "new iteration finished"
                );
                IterationOutcome::Completed(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "iteration failed");
                IterationOutcome::Failed(e.to_string())
            }
        };
        SchedulerState::Persisting {
            guide,
            reason,
            outcome,
        }
    }

    fn persist(
        &self,
        mut guide: Guide,
        reason: TriggerReason,
        outcome: IterationOutcome,
    ) -> PassReport {
        if let IterationOutcome::Failed(error) = &outcome {
            if !self.config.persist_failed_runs {
                return PassReport::Failed {
                    reason,
                    error: error.clone(),
                    saved: None,
                };
            }
        }

        let saved = self.clock.now();
        guide.saved = Some(saved);
        if matches!(outcome, IterationOutcome::Completed(_))
            && self.config.dirty_policy == DirtyClearPolicy::ClearAfter
        {
            guide.dirty = false;
        }

        if let Err(e) = self.store.save_guide(&guide) {
            return PassReport::StoreUnavailable(e.to_string());
        }

        match outcome {
            IterationOutcome::Completed(report) => PassReport::Completed {
                reason,
                report,
                saved,
            },
            IterationOutcome::Failed(error) => PassReport::Failed {
                reason,
                error,
                saved: Some(saved),
            },
        }
    }

    /// Run passes until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Each pass runs on the blocking pool; the poll sleep is the only point
    /// where shutdown is observed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_secs = self.config.poll_interval.as_secs_f64(),
            stale_after_secs = self.config.stale_after.as_secs(),
            dirty_policy = %self.config.dirty_policy,
            "scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let joined = tokio::task::spawn_blocking(move || {
                let report = std::panic::catch_unwind(AssertUnwindSafe(|| self.run_pass()))
                    .unwrap_or_else(|panic| {
                        self.state = SchedulerState::Idle;
                        PassReport::Panicked(panic_message(panic.as_ref()))
                    });
                (self, report)
            })
            .await;

            let (returned, report) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(error = %e, "scheduler worker lost");
                    return;
                }
            };
            self = returned;
            log_pass(&report);

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Off-season is reported on every gated poll; an up-to-date guide is not.
fn skip_level(reason: TriggerReason) -> tracing::Level {
    match reason {
        TriggerReason::OffSeason => tracing::Level::WARN,
        _ => tracing::Level::DEBUG,
    }
}

fn log_pass(report: &PassReport) {
    match report {
        PassReport::Skipped(reason) if skip_level(*reason) == tracing::Level::WARN => {
            tracing::warn!(%reason, "recompute gated")
        }
        PassReport::Skipped(reason) => tracing::debug!(%reason, "no iteration needed"),
        PassReport::Completed { reason, saved, .. } => {
            tracing::info!(%reason, %saved, "guide saved")
        }
        PassReport::Failed {
            reason,
            error,
            saved,
        } => tracing::warn!(%reason, %error, saved = ?saved, "pass finished with a failed iteration"),
        PassReport::StoreUnavailable(error) => {
            tracing::warn!(%error, "guide store unavailable, retrying next pass")
        }
        PassReport::Panicked(message) => {
            tracing::error!(%message, "iteration panicked, retrying next pass")
        }
    }
}
