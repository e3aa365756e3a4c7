use thiserror::Error;

use crate::pipeline::StageKind;

#[derive(Debug, Error)]
pub enum RoutefinderError {
    #[error("guide store unavailable: {0}")]
    GuideDb(String),

    #[error("stage '{stage}' failed: {reason}")]
    StageFailed { stage: StageKind, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid season status '{0}': expected 'on' or 'off'")]
    InvalidSeasonStatus(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RoutefinderError {
    /// True for failures of the guide/season store, which abort a pass
    /// without running an iteration.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::GuideDb(_))
    }
}

pub type Result<T> = std::result::Result<T, RoutefinderError>;
