//! Tool invocation outcomes.

use crate::core::{Artifact, ArtifactKind};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a tool invocation did not succeed.
///
/// These are data, not errors: a failing tool fails its stage and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolFailure {
    /// The process could not be started.
    #[error("failed to start: {0}")]
    Spawn(String),

    /// The process exited with a non-zero status.
    #[error("exited with status {0}")]
    NonZeroExit(i32),

    /// The process was killed by a signal.
    #[error("terminated by signal {}", .0.map_or_else(|| "?".to_string(), |s| s.to_string()))]
    TerminatedBySignal(Option<i32>),

    /// The process exceeded its timeout and was killed.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// A declared output file does not exist.
    #[error("declared output {} is missing", .0.display())]
    MissingArtifact(PathBuf),

    /// A declared output file is empty.
    #[error("declared output {} is empty", .0.display())]
    EmptyArtifact(PathBuf),

    /// An input artifact the tool needs is not available.
    #[error("input artifact {0} is not available")]
    MissingInput(ArtifactKind),

    /// A reference resource the tool needs is not configured.
    #[error("requires {0}, which is not configured")]
    Misconfigured(String),

    /// The run was aborted while the tool was running.
    #[error("run aborted: {0}")]
    Aborted(String),
}

/// Result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Tool name.
    pub tool: String,
    /// Process exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Verified output artifacts. Empty unless the invocation succeeded.
    pub produced: Vec<Artifact>,
    /// Last lines of the tool's stderr.
    pub stderr_tail: String,
    /// Set when the invocation failed.
    pub failure: Option<ToolFailure>,
    /// Wall-clock duration.
    pub duration_ms: u64,
}

impl ToolOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(tool: impl Into<String>, produced: Vec<Artifact>) -> Self {
        Self {
            tool: tool.into(),
            exit_code: Some(0),
            produced,
            stderr_tail: String::new(),
            failure: None,
            duration_ms: 0,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(tool: impl Into<String>, failure: ToolFailure) -> Self {
        let exit_code = match failure {
            ToolFailure::NonZeroExit(code) => Some(code),
            _ => None,
        };
        Self {
            tool: tool.into(),
            exit_code,
            produced: Vec::new(),
            stderr_tail: String::new(),
            failure: Some(failure),
            duration_ms: 0,
        }
    }

    /// Sets the exit code.
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Sets the stderr tail.
    #[must_use]
    pub fn with_stderr_tail(mut self, tail: impl Into<String>) -> Self {
        self.stderr_tail = tail.into();
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns true if the invocation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Returns the failure reason for the stage ledger: tool name, failure,
    /// and the stderr tail when there is one.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        let failure = self.failure.as_ref()?;
        let mut reason = format!("{} {failure}", self.tool);
        if !self.stderr_tail.is_empty() {
            reason.push('\n');
            reason.push_str(&self.stderr_tail);
        }
        Some(reason)
    }
}

/// Returns the last `lines` lines of `text`.
#[must_use]
pub fn tail_lines(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
