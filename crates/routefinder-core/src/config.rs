use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutefinderError};

// ---------------------------------------------------------------------------
// DirtyClearPolicy
// ---------------------------------------------------------------------------

/// When the guide's dirty flag is cleared relative to the iteration it
/// triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirtyClearPolicy {
    /// Clear in the store as soon as the flag is observed. A failed iteration
    /// loses the signal.
    #[default]
    ClearBefore,
    /// Leave the flag set until a successful iteration is persisted.
    ClearAfter,
}

impl FromStr for DirtyClearPolicy {
    type Err = RoutefinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clear-before" => Ok(Self::ClearBefore),
            "clear-after" => Ok(Self::ClearAfter),
            other => Err(RoutefinderError::InvalidConfig(format!(
                "unknown dirty policy '{other}' (expected clear-before or clear-after)"
            ))),
        }
    }
}

impl std::fmt::Display for DirtyClearPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearBefore => f.write_str("clear-before"),
            Self::ClearAfter => f.write_str("clear-after"),
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// A guide older than this triggers a recompute.
    #[serde(default = "default_stale_after")]
    pub stale_after: Duration,
    /// Sleep between passes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(default)]
    pub dirty_policy: DirtyClearPolicy,
    /// Stamp and persist `saved` even when the iteration failed.
    #[serde(default = "default_persist_failed_runs")]
    pub persist_failed_runs: bool,
}

fn default_stale_after() -> Duration {
    Duration::from_secs(86_400)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_persist_failed_runs() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stale_after: default_stale_after(),
            poll_interval: default_poll_interval(),
            dirty_policy: DirtyClearPolicy::default(),
            persist_failed_runs: default_persist_failed_runs(),
        }
    }
}

impl SchedulerConfig {
    /// Reject settings under which staleness could not be detected promptly.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(RoutefinderError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.poll_interval >= self.stale_after {
            return Err(RoutefinderError::InvalidConfig(format!(
                "poll interval ({}s) must be smaller than the staleness threshold ({}s)",
                self.poll_interval.as_secs(),
                self.stale_after.as_secs()
            )));
        }
        Ok(())
    }
}
