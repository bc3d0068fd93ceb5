//! Read coverage against the assembly.

use crate::config::{secs, PipelineConfig};
use crate::core::{Artifact, ArtifactKind};
use crate::tools::{CommandTool, ToolCommand, ToolContext, ToolFailure};
use std::path::PathBuf;

/// BBMap alignment of a read pair back to the filtered contigs.
#[derive(Debug, Clone, Copy)]
pub struct BbMap {
    reads: ArtifactKind,
}

impl BbMap {
    /// Maps the given read-pair artifact.
    #[must_use]
    pub fn new(reads: ArtifactKind) -> Self {
        Self { reads }
    }
}

impl Default for BbMap {
    fn default() -> Self {
        Self::new(ArtifactKind::TrimmedReads)
    }
}

impl CommandTool for BbMap {
    fn tool_name(&self) -> &'static str {
        "bbmap"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.bbmap.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let (forward, reverse) = ctx.input_pair(self.reads)?;
        let contigs = ctx.input_file(ArtifactKind::FilteredContigs)?;
        let covstats = ctx.sample_file("_covstats.txt");
        let covhist = ctx.sample_file("_covhist.tsv");
        let basecov = ctx.sample_file("_basecov.txt");
        let bam = ctx.sample_file("_mapped.bam");

        Ok(ToolCommand::new(&ctx.config.tools.bbmap)
            .kv("in1", forward)
            .kv("in2", reverse)
            .kv("ref", contigs)
            .kv("covstats", &covstats)
            .kv("covhist", &covhist)
            .kv("basecov", &basecov)
            .kv("out", &bam)
            .kv("threads", ctx.threads())
            .kv("nodisk", "t")
            .kv("overwrite", "t")
            .output(Artifact::new(ArtifactKind::Coverage, vec![covstats, bam]))
            .timeout(secs(ctx.config.timeouts.coverage_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::core::Sample;
    use crate::stages::StageResult;
    use chrono::Utc;

    #[test]
    fn test_bbmap_command() {
        let mut sample = Sample::new("A", "/in/A_R1.fq", "/in/A_R2.fq", "/o/A");
        sample.record(StageResult::success(
            "quality_control",
            Utc::now(),
            vec![Artifact::pair(ArtifactKind::TrimmedReads, "/o/t1.fq.gz", "/o/t2.fq.gz")],
        ));
        sample.record(StageResult::success(
            "contig_filter",
            Utc::now(),
            vec![Artifact::single(ArtifactKind::FilteredContigs, "/o/f.fasta")],
        ));
        let config = PipelineConfig::default();
        let stage_dir = sample.stage_dir("coverage");
        let cancel = CancellationToken::new();
        let ctx = ToolContext {
            sample: &sample,
            stage: "coverage",
            stage_dir: &stage_dir,
            config: &config,
            staged: &[],
            cancel: &cancel,
        };

        let rendered = BbMap::default().command(&ctx).unwrap().display();
        assert!(rendered.starts_with("bbmap.sh in1=/o/t1.fq.gz in2=/o/t2.fq.gz ref=/o/f.fasta"));
        assert!(rendered.contains("covstats=/o/A/coverage/A_covstats.txt"));
        assert!(rendered.contains("out=/o/A/coverage/A_mapped.bam"));
    }
}
