//! Read quality reports.

use crate::config::{secs, PipelineConfig};
use crate::core::{Artifact, ArtifactKind};
use crate::tools::{CommandTool, ToolCommand, ToolContext, ToolFailure};
use std::path::{Path, PathBuf};

/// FastQC over a read pair.
///
/// Over the raw reads it produces a [`ArtifactKind::RawReadQcReport`], over
/// anything else a [`ArtifactKind::ReadQcReport`].
#[derive(Debug, Clone, Copy)]
pub struct FastQc {
    reads: ArtifactKind,
}

impl FastQc {
    /// Creates a report over the given read kind.
    #[must_use]
    pub fn new(reads: ArtifactKind) -> Self {
        Self { reads }
    }

    fn report_kind(self) -> ArtifactKind {
        if self.reads == ArtifactKind::RawReads {
            ArtifactKind::RawReadQcReport
        } else {
            ArtifactKind::ReadQcReport
        }
    }
}

impl Default for FastQc {
    fn default() -> Self {
        Self::new(ArtifactKind::TrimmedReads)
    }
}

/// Returns the HTML report name FastQC writes for a read file.
fn report_name(reads: &Path) -> String {
    let name = reads
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = [".gz", ".bz2"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(&name);
    let name = [".fastq", ".fq", ".txt", ".sam", ".bam"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name);
    format!("{name}_fastqc.html")
}

impl CommandTool for FastQc {
    fn tool_name(&self) -> &'static str {
        "fastqc"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.fastqc.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let (forward, reverse) = ctx.input_pair(self.reads)?;
        let reports = vec![
            ctx.stage_dir.join(report_name(forward)),
            ctx.stage_dir.join(report_name(reverse)),
        ];

        Ok(ToolCommand::new(&ctx.config.tools.fastqc)
            .arg("-o")
            .arg(ctx.stage_dir)
            .arg("-t")
            .arg(ctx.threads())
            .arg(forward)
            .arg(reverse)
            .output(Artifact::new(self.report_kind(), reports))
            .timeout(secs(ctx.config.timeouts.read_qc_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::core::Sample;

    #[test]
    fn test_report_name() {
        assert_eq!(report_name(Path::new("/o/A_R1_paired.fastq.gz")), "A_R1_paired_fastqc.html");
        assert_eq!(report_name(Path::new("B_2.fq")), "B_2_fastqc.html");
        assert_eq!(report_name(Path::new("C.reads")), "C.reads_fastqc.html");
    }

    #[test]
    fn test_fastqc_uses_staged_trimmed_reads() {
        let sample = Sample::new("A", "/in/A_R1.fq", "/in/A_R2.fq", "/o/A");
        let stage_dir = sample.stage_dir("quality_control");
        let staged = vec![Artifact::pair(
            ArtifactKind::TrimmedReads,
            stage_dir.join("A_R1_paired.fastq.gz"),
            stage_dir.join("A_R2_paired.fastq.gz"),
        )];
        let config = PipelineConfig::default();
        let cancel = CancellationToken::new();
        let ctx = ToolContext {
            sample: &sample,
            stage: "quality_control",
            stage_dir: &stage_dir,
            config: &config,
            staged: &staged,
            cancel: &cancel,
        };

        let command = FastQc::default().command(&ctx).unwrap();
        assert_eq!(
            command.display(),
            "fastqc -o /o/A/quality_control -t 4 /o/A/quality_control/A_R1_paired.fastq.gz \
             /o/A/quality_control/A_R2_paired.fastq.gz"
        );
        assert_eq!(
            command.declared_outputs[0].paths,
            vec![
                PathBuf::from("/o/A/quality_control/A_R1_paired_fastqc.html"),
                PathBuf::from("/o/A/quality_control/A_R2_paired_fastqc.html"),
            ]
        );
    }

    #[test]
    fn test_fastqc_over_raw_reads() {
        let sample = Sample::new("A", "/in/A_R1_001.fastq.gz", "/in/A_R2_001.fastq.gz", "/o/A");
        let stage_dir = sample.stage_dir("raw_read_qc");
        let config = PipelineConfig::default();
        let cancel = CancellationToken::new();
        let ctx = ToolContext {
            sample: &sample,
            stage: "raw_read_qc",
            stage_dir: &stage_dir,
            config: &config,
            staged: &[],
            cancel: &cancel,
        };

        let command = FastQc::new(ArtifactKind::RawReads).command(&ctx).unwrap();
        assert_eq!(
            command.display(),
            "fastqc -o /o/A/raw_read_qc -t 4 /in/A_R1_001.fastq.gz /in/A_R2_001.fastq.gz"
        );
        let report = &command.declared_outputs[0];
        assert_eq!(report.kind, ArtifactKind::RawReadQcReport);
        assert_eq!(
            report.paths,
            vec![
                PathBuf::from("/o/A/raw_read_qc/A_R1_001_fastqc.html"),
                PathBuf::from("/o/A/raw_read_qc/A_R2_001_fastqc.html"),
            ]
        );
    }

    #[test]
    fn test_fastqc_without_trimmed_reads() {
        let sample = Sample::new("A", "/in/A_R1.fq", "/in/A_R2.fq", "/o/A");
        let stage_dir = sample.stage_dir("quality_control");
        let config = PipelineConfig::default();
        let cancel = CancellationToken::new();
        let ctx = ToolContext {
            sample: &sample,
            stage: "quality_control",
            stage_dir: &stage_dir,
            config: &config,
            staged: &[],
            cancel: &cancel,
        };

        assert_eq!(
            FastQc::default().command(&ctx).unwrap_err(),
            ToolFailure::MissingInput(ArtifactKind::TrimmedReads)
        );
    }
}
