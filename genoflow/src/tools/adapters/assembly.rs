//! Assembly, contig filtering and assembly evaluation.

use crate::config::{secs, PipelineConfig};
use crate::core::{Artifact, ArtifactKind};
use crate::tools::{CommandTool, ToolCommand, ToolContext, ToolFailure};
use std::path::PathBuf;

/// SPAdes de novo assembly of a read pair.
#[derive(Debug, Clone, Copy)]
pub struct Spades {
    reads: ArtifactKind,
}

impl Spades {
    /// Assembles the given read-pair artifact.
    #[must_use]
    pub fn new(reads: ArtifactKind) -> Self {
        Self { reads }
    }
}

impl Default for Spades {
    fn default() -> Self {
        Self::new(ArtifactKind::TrimmedReads)
    }
}

impl CommandTool for Spades {
    fn tool_name(&self) -> &'static str {
        "spades"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.spades.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let (forward, reverse) = ctx.input_pair(self.reads)?;

        Ok(ToolCommand::new(&ctx.config.tools.spades)
            .arg("--pe1-1")
            .arg(forward)
            .arg("--pe1-2")
            .arg(reverse)
            .arg("-o")
            .arg(ctx.stage_dir)
            .arg("-t")
            .arg(ctx.threads())
            .arg("-m")
            .arg(ctx.config.resources.memory_gb.to_string())
            .output(Artifact::single(
                ArtifactKind::Contigs,
                ctx.stage_dir.join("contigs.fasta"),
            ))
            .timeout(secs(ctx.config.timeouts.assembly_secs)))
    }
}

/// BBTools `reformat.sh` minimum contig length filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reformat;

impl CommandTool for Reformat {
    fn tool_name(&self) -> &'static str {
        "reformat"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.reformat.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let contigs = ctx.input_file(ArtifactKind::Contigs)?;
        let filtered = ctx.sample_file("_filtered_contigs.fasta");

        Ok(ToolCommand::new(&ctx.config.tools.reformat)
            .kv("in", contigs)
            .kv("out", &filtered)
            .kv("minlength", ctx.config.assembly.min_contig_length.to_string())
            .kv("overwrite", "t")
            .output(Artifact::single(ArtifactKind::FilteredContigs, filtered))
            .timeout(secs(ctx.config.timeouts.contig_filter_secs)))
    }
}

/// QUAST evaluation of the filtered contigs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quast;

impl CommandTool for Quast {
    fn tool_name(&self) -> &'static str {
        "quast"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.quast.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let contigs = ctx.input_file(ArtifactKind::FilteredContigs)?;

        Ok(ToolCommand::new(&ctx.config.tools.quast)
            .arg(contigs)
            .arg("-o")
            .arg(ctx.stage_dir)
            .arg("-t")
            .arg(ctx.threads())
            .output(Artifact::single(
                ArtifactKind::AssemblyReport,
                ctx.stage_dir.join("report.tsv"),
            ))
            .timeout(secs(ctx.config.timeouts.evaluation_secs)))
    }
}
