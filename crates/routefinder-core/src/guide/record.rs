//! Guide and season records.
//!
//! The `Guide` is the only scheduling state routefinder keeps: when the last
//! iteration finished and whether an upstream change asked for a recompute.
//! The `Season` is written by whoever runs the business calendar; routefinder
//! only reads the most recent one.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::RoutefinderError;

// ---------------------------------------------------------------------------
// Guide
// ---------------------------------------------------------------------------

/// The singleton recompute guide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    /// Assigned by the store on first insert. `None` means "not yet persisted".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// End of the last completed iteration, stored as float epoch seconds.
    #[serde(
        serialize_with = "serialize_epoch_opt",
        deserialize_with = "deserialize_epoch_opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub saved: Option<DateTime<Utc>>,
    /// Force a recompute regardless of staleness.
    #[serde(default)]
    pub dirty: bool,
}

impl Guide {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// True when more than `stale_after` has passed since `saved`.
    ///
    /// A guide that was never stamped counts as saved at the epoch.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        let saved = self.saved.unwrap_or(DateTime::UNIX_EPOCH);
        let Ok(threshold) = chrono::Duration::from_std(stale_after) else {
            return false;
        };
        now.signed_duration_since(saved) > threshold
    }
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

/// Season gate position. Anything that is not an explicit `off`-like string
/// keeps recomputation enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonStatus {
    #[default]
    On,
    Off,
}

impl SeasonStatus {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for SeasonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

impl FromStr for SeasonStatus {
    type Err = RoutefinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(RoutefinderError::InvalidSeasonStatus(other.to_string())),
        }
    }
}

/// A season record. The most recent one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: SeasonStatus,
    #[serde(default)]
    pub recorded_at: DateTime<Utc>,
}

impl Season {
    pub fn new(status: SeasonStatus) -> Self {
        Self {
            status,
            recorded_at: Utc::now(),
        }
    }
}

/// `"on"` is on, any other string is off, a missing or non-string status is on.
fn deserialize_status<'de, D>(d: D) -> Result<SeasonStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) if s != "on" => SeasonStatus::Off,
        _ => SeasonStatus::On,
    })
}

// ---------------------------------------------------------------------------
// Serde helpers for timestamps (serialized as float epoch seconds)
// ---------------------------------------------------------------------------

fn serialize_epoch_opt<S>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ts {
        Some(ts) => {
            let secs = ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1e9;
            s.serialize_some(&secs)
        }
        None => s.serialize_none(),
    }
}

fn deserialize_epoch_opt<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<f64> = Option::deserialize(d)?;
    opt.map(|secs| {
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
    })
    .transpose()
}
