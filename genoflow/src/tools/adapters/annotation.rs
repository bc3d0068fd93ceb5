//! Genome annotation.

use crate::config::{secs, PipelineConfig};
use crate::core::{Artifact, ArtifactKind};
use crate::tools::{CommandTool, ToolCommand, ToolContext, ToolFailure};
use std::path::PathBuf;

/// Prokka annotation of the filtered contigs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prokka;

impl CommandTool for Prokka {
    fn tool_name(&self) -> &'static str {
        "prokka"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.prokka.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let contigs = ctx.input_file(ArtifactKind::FilteredContigs)?;
        let prefix = ctx.sample.name();

        let mut command = ToolCommand::new(&ctx.config.tools.prokka)
            .arg("--outdir")
            .arg(ctx.stage_dir)
            .arg("--prefix")
            .arg(prefix)
            .arg("--cpus")
            .arg(ctx.threads())
            .arg("--force");
        if let Some(db) = &ctx.config.references.annotation_db {
            command = command.arg("--proteins").arg(db);
        }

        Ok(command
            .arg(contigs)
            .output(Artifact::new(
                ArtifactKind::Annotation,
                vec![ctx.sample_file(".gff"), ctx.sample_file(".gbk")],
            ))
            .timeout(secs(ctx.config.timeouts.annotation_secs)))
    }
}
