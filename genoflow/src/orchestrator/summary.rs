//! Run summary.

use super::aggregate::AggregateReport;
use crate::core::SampleStatus;
use crate::errors::{DiscoveryWarning, GenoflowError};
use crate::pipeline::SampleReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// File name of the summary inside the output directory.
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Sample counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    /// Samples discovered.
    pub discovered: usize,
    /// Samples whose every stage succeeded.
    pub complete: usize,
    /// Samples with a failed or skipped optional stage.
    pub partial: usize,
    /// Samples with a failed required stage.
    pub failed: usize,
}

/// Aggregated, machine-readable report of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run id.
    pub run_id: Uuid,
    /// Version of genoflow that produced the run.
    pub version: String,
    /// Input directory.
    pub input_dir: PathBuf,
    /// Output directory.
    pub output_dir: PathBuf,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Sample counts.
    pub counts: SampleCounts,
    /// Files discovery could not place into a sample.
    pub warnings: Vec<DiscoveryWarning>,
    /// Per-sample reports keyed by sample name.
    pub samples: BTreeMap<String, SampleReport>,
    /// Set when the run was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    /// Run-level MultiQC report, when it was attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateReport>,
}

impl RunSummary {
    /// Aggregates sample reports into a summary.
    #[must_use]
    pub fn new(
        input_dir: &Path,
        output_dir: &Path,
        started_at: DateTime<Utc>,
        reports: Vec<SampleReport>,
        warnings: Vec<DiscoveryWarning>,
        aborted: Option<String>,
    ) -> Self {
        let mut counts = SampleCounts {
            discovered: reports.len(),
            ..SampleCounts::default()
        };
        for report in &reports {
            match report.status {
                SampleStatus::Complete => counts.complete += 1,
                SampleStatus::Partial => counts.partial += 1,
                SampleStatus::Failed => counts.failed += 1,
            }
        }
        Self {
            run_id: Uuid::new_v4(),
            version: crate::VERSION.to_string(),
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            counts,
            warnings,
            samples: reports.into_iter().map(|r| (r.sample.clone(), r)).collect(),
            aborted,
            aggregate: None,
        }
    }

    /// Returns the process exit code for the run.
    ///
    /// 0 when the run was not aborted and every sample is complete, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let all_complete = self
            .samples
            .values()
            .all(|r| r.status == SampleStatus::Complete);
        if self.aborted.is_none() && all_complete {
            0
        } else {
            1
        }
    }

    /// Returns the summary file path for an output directory.
    #[must_use]
    pub fn path(output_dir: &Path) -> PathBuf {
        output_dir.join(SUMMARY_FILE)
    }

    /// Writes the summary as pretty JSON into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf, GenoflowError> {
        let path = Self::path(output_dir);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| GenoflowError::io(&path, e))?;
        Ok(path)
    }

    /// Logs one line per sample plus the totals.
    pub fn log_table(&self) {
        let width = self.samples.keys().map(String::len).max().unwrap_or(6).max(6);
        info!("{:<width$}  {:<8}  detail", "sample", "status");
        for (name, report) in &self.samples {
            let detail = report.failure_summary().unwrap_or_default();
            info!("{name:<width$}  {:<8}  {detail}", report.status.to_string());
        }
        info!(
            discovered = self.counts.discovered,
            complete = self.counts.complete,
            partial = self.counts.partial,
            failed = self.counts.failed,
            warnings = self.warnings.len(),
            "Run finished"
        );
        if let Some(aggregate) = &self.aggregate {
            match &aggregate.report {
                Some(report) => info!(report = %report.display(), "MultiQC report"),
                None => info!(
                    status = %aggregate.status,
                    reason = aggregate.reason.as_deref().unwrap_or_default(),
                    "No MultiQC report"
                ),
            }
        }
        if let Some(reason) = &self.aborted {
            warn!(%reason, "Run was aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(name: &str, status: SampleStatus) -> SampleReport {
        SampleReport {
            sample: name.to_string(),
            status,
            results: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_counts_and_exit_code() {
        let summary = RunSummary::new(
            Path::new("/in"),
            Path::new("/out"),
            Utc::now(),
            vec![
                report("C", SampleStatus::Complete),
                report("A", SampleStatus::Failed),
                report("B", SampleStatus::Complete),
            ],
            Vec::new(),
            None,
        );

        assert_eq!(
            summary.counts,
            SampleCounts {
                discovered: 3,
                complete: 2,
                partial: 0,
                failed: 1,
            }
        );
        assert_eq!(summary.samples.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_zero_only_when_complete_and_not_aborted() {
        let ok = RunSummary::new(
            Path::new("/in"),
            Path::new("/out"),
            Utc::now(),
            vec![report("A", SampleStatus::Complete)],
            Vec::new(),
            None,
        );
        assert_eq!(ok.exit_code(), 0);

        let partial = RunSummary::new(
            Path::new("/in"),
            Path::new("/out"),
            Utc::now(),
            vec![report("A", SampleStatus::Partial)],
            Vec::new(),
            None,
        );
        assert_eq!(partial.exit_code(), 1);

        let empty = RunSummary::new(Path::new("/in"), Path::new("/out"), Utc::now(), Vec::new(), Vec::new(), None);
        assert_eq!(empty.exit_code(), 0);

        let aborted = RunSummary::new(
            Path::new("/in"),
            Path::new("/out"),
            Utc::now(),
            Vec::new(),
            Vec::new(),
            Some("run timeout".to_string()),
        );
        assert_eq!(aborted.exit_code(), 1);
    }

    #[test]
    fn test_write_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let summary = RunSummary::new(
            Path::new("/in"),
            dir.path(),
            Utc::now(),
            vec![report("A", SampleStatus::Complete)],
            vec![DiscoveryWarning::Orphan {
                sample: "B".to_string(),
                files: vec![PathBuf::from("/in/B_R1_001.fastq.gz")],
            }],
            None,
        );

        let path = summary.write(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("run_summary.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["counts"]["complete"], 1);
        assert_eq!(json["samples"]["A"]["status"], "complete");
        assert_eq!(json["warnings"][0]["kind"], "orphan");
        assert!(json.get("aborted").is_none());
        summary.log_table();
    }
}
