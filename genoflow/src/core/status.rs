//! Stage and sample status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of one stage applied to one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Every adapter of the stage succeeded and its artifacts were verified.
    Success,
    /// An adapter failed, or the run was aborted while the stage ran.
    Failed,
    /// The stage did not run.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the stage ran and failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Overall status of a sample after its pipeline finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    /// Every stage succeeded.
    Complete,
    /// Required stages succeeded but an optional stage did not.
    Partial,
    /// A required stage failed or could not run.
    Failed,
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Success.to_string(), "success");
        assert_eq!(StageStatus::Failed.to_string(), "failed");
        assert_eq!(StageStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_stage_status_predicates() {
        assert!(StageStatus::Success.is_success());
        assert!(!StageStatus::Skipped.is_success());
        assert!(StageStatus::Failed.is_failure());
        assert!(!StageStatus::Skipped.is_failure());
    }

    #[test]
    fn test_sample_status_serialize() {
        let json = serde_json::to_string(&SampleStatus::Partial).unwrap();
        assert_eq!(json, r#""partial""#);

        let deserialized: SampleStatus = serde_json::from_str(r#""complete""#).unwrap();
        assert_eq!(deserialized, SampleStatus::Complete);
    }
}
