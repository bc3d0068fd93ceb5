//! Stage result type.

use crate::core::{Artifact, ArtifactKind, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason recorded when a stage's input artifacts are not available.
pub const MISSING_PREREQUISITE: &str = "missing prerequisite artifact";

/// Reason recorded for stages after a failed required stage.
pub const UPSTREAM_REQUIRED_FAILED: &str = "upstream required stage failed";

/// Prefix of the reason recorded when the run was aborted.
pub const RUN_ABORTED: &str = "run aborted";

/// Outcome of one stage applied to one sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage: String,
    /// Stage status.
    pub status: StageStatus,
    /// Artifacts produced by the stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// Exit code of the tool that decided the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Name of the tool that decided the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Failure or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whether the result was satisfied by a previous run's outputs.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reused: bool,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
}

impl StageResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(
        stage: impl Into<String>,
        started_at: DateTime<Utc>,
        artifacts: Vec<Artifact>,
    ) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Success,
            artifacts,
            exit_code: None,
            tool: None,
            reason: None,
            reused: false,
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a successful result restored from a completion marker.
    #[must_use]
    pub fn reused(stage: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        let now = Utc::now();
        Self {
            reused: true,
            ..Self::success(stage, now, artifacts)
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(
        stage: impl Into<String>,
        started_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Failed,
            artifacts: Vec::new(),
            exit_code: None,
            tool: None,
            reason: Some(reason.into()),
            reused: false,
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            stage: stage.into(),
            status: StageStatus::Skipped,
            artifacts: Vec::new(),
            exit_code: None,
            tool: None,
            reason: Some(reason.into()),
            reused: false,
            started_at: now,
            ended_at: now,
        }
    }

    /// Sets the deciding tool.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Sets the exit code.
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Sets the artifacts.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Returns the produced artifact of `kind`, if any.
    #[must_use]
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

/// Builds the reason text for an aborted run.
#[must_use]
pub fn aborted_reason(reason: &str) -> String {
    format!("{RUN_ABORTED}: {reason}")
}
