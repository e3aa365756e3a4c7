//! Recompute trigger.
//!
//! Decides, once per scheduler pass, whether the pipeline has to run. Rules
//! are evaluated in order and the first match wins:
//!
//! 1. Season gate: the most recent season is off → no run, empty guide.
//! 2. No guide persisted yet → run (bootstrap).
//! 3. Guide older than the staleness threshold → run, guide untouched.
//! 4. Guide dirty → run; under `ClearBefore` the flag is cleared in the store
//!    before returning.
//! 5. Otherwise → no run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{DirtyClearPolicy, SchedulerConfig};
use crate::error::Result;
use crate::guide::{Guide, GuideStore};

/// Which rule decided a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    OffSeason,
    Bootstrap,
    Stale,
    Dirty,
    UpToDate,
}

impl TriggerReason {
    pub fn triggers(self) -> bool {
        matches!(self, Self::Bootstrap | Self::Stale | Self::Dirty)
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OffSeason => "off-season",
            Self::Bootstrap => "bootstrap",
            Self::Stale => "stale",
            Self::Dirty => "dirty",
            Self::UpToDate => "up-to-date",
        };
        f.write_str(s)
    }
}

/// Outcome of `TriggerEvaluator::should_trigger`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDecision {
    pub reason: TriggerReason,
    /// The guide to carry through the iteration and persist afterwards.
    /// Empty for the bootstrap and off-season cases.
    pub guide: Guide,
}

impl TriggerDecision {
    pub fn triggered(&self) -> bool {
        self.reason.triggers()
    }
}

pub struct TriggerEvaluator {
    store: Arc<dyn GuideStore>,
    stale_after: Duration,
    dirty_policy: DirtyClearPolicy,
}

impl TriggerEvaluator {
    pub fn new(store: Arc<dyn GuideStore>, config: &SchedulerConfig) -> Self {
        Self {
            store,
            stale_after: config.stale_after,
            dirty_policy: config.dirty_policy,
        }
    }

    pub fn dirty_policy(&self) -> DirtyClearPolicy {
        self.dirty_policy
    }

    pub fn should_trigger(&self, now: DateTime<Utc>) -> Result<TriggerDecision> {
        if let Some(season) = self.store.load_season()? {
            if !season.status.is_on() {
                tracing::debug!(status = %season.status, "off-season, recompute suppressed");
                return Ok(TriggerDecision {
                    reason: TriggerReason::OffSeason,
                    guide: Guide::default(),
                });
            }
        }

        let Some(mut guide) = self.store.load_guide()? else {
            return Ok(TriggerDecision {
                reason: TriggerReason::Bootstrap,
                guide: Guide::default(),
            });
        };

        if guide.is_stale(now, self.stale_after) {
            return Ok(TriggerDecision {
                reason: TriggerReason::Stale,
                guide,
            });
        }

        if guide.dirty {
            if self.dirty_policy == DirtyClearPolicy::ClearBefore {
                self.store.set_dirty(false)?;
                guide.dirty = false;
            }
            return Ok(TriggerDecision {
                reason: TriggerReason::Dirty,
                guide,
            });
        }

        Ok(TriggerDecision {
            reason: TriggerReason::UpToDate,
            guide,
        })
    }
}
