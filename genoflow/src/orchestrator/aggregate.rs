//! Run-level MultiQC report.
//!
//! Runs once after every sample has finished, over the whole output tree, so
//! the read QC, evaluation and coverage reports of all samples end up in one
//! place. It never changes the run's exit code.

use crate::cancellation::CancellationToken;
use crate::config::{secs, PipelineConfig};
use crate::core::{Artifact, ArtifactKind, StageStatus};
use crate::stages::aborted_reason;
use crate::tools::{process, ToolCommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Tool name of the run-level report.
pub const MULTIQC: &str = "multiqc";

/// Directory inside the output directory that receives the report.
pub const MULTIQC_DIR: &str = "multiqc";

/// Outcome of the run-level report step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Tool name.
    pub tool: String,
    /// Whether the report was produced.
    pub status: StageStatus,
    /// The HTML report, when produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
    /// Why no report was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AggregateReport {
    fn with_status(status: StageStatus, reason: impl Into<String>) -> Self {
        Self {
            tool: MULTIQC.to_string(),
            status,
            report: None,
            reason: Some(reason.into()),
        }
    }
}

/// Builds the MultiQC command over `output_dir`.
#[must_use]
pub fn multiqc_command(program: &Path, output_dir: &Path, config: &PipelineConfig) -> ToolCommand {
    let report_dir = output_dir.join(MULTIQC_DIR);
    ToolCommand::new(program)
        .arg("--force")
        .arg("-o")
        .arg(&report_dir)
        .arg(output_dir)
        .output(Artifact::single(
            ArtifactKind::MultiQcReport,
            report_dir.join("multiqc_report.html"),
        ))
        .timeout(secs(config.timeouts.multiqc_secs))
}

/// Runs MultiQC over `output_dir`.
///
/// `program` is the resolved executable; `None` (not installed) and an
/// aborted run both skip the report.
pub async fn run_multiqc(
    program: Option<&Path>,
    output_dir: &Path,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> AggregateReport {
    if let Some(reason) = cancel.reason() {
        return AggregateReport::with_status(StageStatus::Skipped, aborted_reason(&reason));
    }
    let Some(program) = program else {
        warn!("MultiQC not found, skipping run report");
        return AggregateReport::with_status(StageStatus::Skipped, "multiqc not found");
    };

    let report_dir = output_dir.join(MULTIQC_DIR);
    if let Err(e) = tokio::fs::create_dir_all(&report_dir).await {
        let reason = format!("cannot create {}: {e}", report_dir.display());
        warn!(%reason, "MultiQC report failed");
        return AggregateReport::with_status(StageStatus::Failed, reason);
    }

    let command = multiqc_command(program, output_dir, config);
    let outcome = process::execute(
        MULTIQC,
        &command,
        &report_dir.join("multiqc.log"),
        config.stderr_tail_lines,
        cancel,
    )
    .await;

    match outcome.reason() {
        None => {
            let report = outcome
                .produced
                .first()
                .and_then(Artifact::primary)
                .map(Path::to_path_buf);
            info!(report = ?report, duration_ms = outcome.duration_ms, "Wrote MultiQC report");
            AggregateReport {
                tool: MULTIQC.to_string(),
                status: StageStatus::Success,
                report,
                reason: None,
            }
        }
        Some(reason) => {
            warn!(%reason, "MultiQC report failed");
            AggregateReport::with_status(StageStatus::Failed, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_multiqc_command() {
        let config = PipelineConfig::default();
        let command = multiqc_command(Path::new("/usr/bin/multiqc"), Path::new("/out"), &config);

        assert_eq!(command.display(), "/usr/bin/multiqc --force -o /out/multiqc /out");
        assert_eq!(
            command.declared_outputs[0].paths,
            vec![PathBuf::from("/out/multiqc/multiqc_report.html")]
        );
        assert_eq!(command.timeout, secs(Some(3600)));
    }

    #[tokio::test]
    async fn test_missing_multiqc_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default();

        let report = run_multiqc(None, dir.path(), &config, &CancellationToken::new()).await;

        assert_eq!(report.status, StageStatus::Skipped);
        assert_eq!(report.reason.as_deref(), Some("multiqc not found"));
        assert!(!dir.path().join(MULTIQC_DIR).exists());
    }

    #[tokio::test]
    async fn test_aborted_run_skips_report() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel("operator interrupt");

        let report = run_multiqc(
            Some(Path::new("/usr/bin/multiqc")),
            dir.path(),
            &PipelineConfig::default(),
            &cancel,
        )
        .await;

        assert_eq!(report.status, StageStatus::Skipped);
        assert_eq!(report.reason.as_deref(), Some("run aborted: operator interrupt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_multiqc_script_writes_report() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("multiqc");
        std::fs::write(&program, "#!/bin/sh\necho '<html/>' > \"$3/multiqc_report.html\"\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        let output = dir.path().join("results");
        std::fs::create_dir(&output).unwrap();

        let report = run_multiqc(
            Some(&program),
            &output,
            &PipelineConfig::default(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(report.status, StageStatus::Success);
        assert_eq!(report.report, Some(output.join("multiqc/multiqc_report.html")));
        assert!(output.join("multiqc/multiqc.log").exists());
    }
}
