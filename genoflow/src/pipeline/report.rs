//! Per-sample reports.

use crate::core::{Sample, SampleStatus};
use crate::stages::{StageDefinition, StageResult, RUN_ABORTED};
use serde::{Deserialize, Serialize};

/// Read-only summary of one sample's stage ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleReport {
    /// Sample name.
    pub sample: String,
    /// Overall status.
    pub status: SampleStatus,
    /// One result per stage, in stage order.
    pub results: Vec<StageResult>,
    /// Set when the sample pipeline itself could not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SampleReport {
    /// Builds the report of a sample whose pipeline finished.
    ///
    /// The ledger holds one result per stage of `stages`, in order.
    #[must_use]
    pub fn from_ledger(sample: &Sample, stages: &[StageDefinition]) -> Self {
        let results = sample.results().to_vec();
        let status = derive_status(stages, &results);
        Self {
            sample: sample.name().to_string(),
            status,
            results,
            error: None,
        }
    }

    /// Builds a failed report for a sample whose pipeline did not finish.
    #[must_use]
    pub fn failed(sample: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            status: SampleStatus::Failed,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Returns the first failed stage result, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StageResult> {
        self.results.iter().find(|r| r.status.is_failure())
    }

    /// Returns a one-line explanation of why the sample is not complete.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        let result = self
            .first_failure()
            .or_else(|| self.results.iter().find(|r| !r.status.is_success()))?;
        let reason = result.reason.as_deref().unwrap_or_default();
        let first_line = reason.lines().next().unwrap_or_default();
        Some(format!("{}: {first_line}", result.stage))
    }
}

fn derive_status(stages: &[StageDefinition], results: &[StageResult]) -> SampleStatus {
    let aborted = results.iter().any(|r| {
        r.reason
            .as_deref()
            .is_some_and(|reason| reason.starts_with(RUN_ABORTED))
    });
    if aborted || results.len() < stages.len() {
        return SampleStatus::Failed;
    }

    let mut complete = true;
    for (stage, result) in stages.iter().zip(results) {
        if result.status.is_success() {
            continue;
        }
        if stage.required {
            return SampleStatus::Failed;
        }
        complete = false;
    }
    if complete {
        SampleStatus::Complete
    } else {
        SampleStatus::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{aborted_reason, MISSING_PREREQUISITE, UPSTREAM_REQUIRED_FAILED};
    use crate::testing::ScriptedTool;
    use chrono::Utc;

    fn stages() -> Vec<StageDefinition> {
        vec![
            StageDefinition::new("assembly").with_adapter(ScriptedTool::new("spades")),
            StageDefinition::new("evaluation")
                .with_adapter(ScriptedTool::new("quast"))
                .optional(),
        ]
    }

    fn sample_with(results: Vec<StageResult>) -> Sample {
        let mut sample = Sample::new("A", "f.fq", "r.fq", "/out/A");
        for result in results {
            sample.record(result);
        }
        sample
    }

    #[test]
    fn test_complete_partial_failed() {
        let ok = |stage: &str| StageResult::success(stage, Utc::now(), Vec::new());

        let complete = SampleReport::from_ledger(&sample_with(vec![ok("assembly"), ok("evaluation")]), &stages());
        assert_eq!(complete.status, SampleStatus::Complete);
        assert!(complete.failure_summary().is_none());

        let partial = SampleReport::from_ledger(
            &sample_with(vec![
                ok("assembly"),
                StageResult::failed("evaluation", Utc::now(), "quast exited with status 1\nTraceback"),
            ]),
            &stages(),
        );
        assert_eq!(partial.status, SampleStatus::Partial);
        assert_eq!(
            partial.failure_summary().as_deref(),
            Some("evaluation: quast exited with status 1")
        );

        let failed = SampleReport::from_ledger(
            &sample_with(vec![
                StageResult::skipped("assembly", MISSING_PREREQUISITE),
                StageResult::skipped("evaluation", UPSTREAM_REQUIRED_FAILED),
            ]),
            &stages(),
        );
        assert_eq!(failed.status, SampleStatus::Failed);
        assert!(failed.first_failure().is_none());
        assert_eq!(
            failed.failure_summary().as_deref(),
            Some("assembly: missing prerequisite artifact")
        );
    }

    #[test]
    fn test_aborted_sample_is_failed() {
        let report = SampleReport::from_ledger(
            &sample_with(vec![
                StageResult::success("assembly", Utc::now(), Vec::new()),
                StageResult::skipped("evaluation", aborted_reason("operator interrupt")),
            ]),
            &stages(),
        );
        assert_eq!(report.status, SampleStatus::Failed);
    }

    #[test]
    fn test_failed_report_serialization() {
        let report = SampleReport::failed("B", "sample pipeline panicked");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "sample pipeline panicked");
        assert_eq!(json["results"].as_array().unwrap().len(), 0);
    }
}
