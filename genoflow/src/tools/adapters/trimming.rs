//! Read trimmers.

use crate::config::{secs, PipelineConfig};
use crate::core::{Artifact, ArtifactKind};
use crate::tools::{CommandTool, ToolCommand, ToolContext, ToolFailure};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

struct TrimmedPaths {
    forward_paired: PathBuf,
    forward_unpaired: PathBuf,
    reverse_paired: PathBuf,
    reverse_unpaired: PathBuf,
}

impl TrimmedPaths {
    fn new(ctx: &ToolContext<'_>) -> Self {
        Self {
            forward_paired: ctx.sample_file("_R1_paired.fastq.gz"),
            forward_unpaired: ctx.sample_file("_R1_unpaired.fastq.gz"),
            reverse_paired: ctx.sample_file("_R2_paired.fastq.gz"),
            reverse_unpaired: ctx.sample_file("_R2_unpaired.fastq.gz"),
        }
    }

    fn artifact(&self) -> Artifact {
        Artifact::pair(
            ArtifactKind::TrimmedReads,
            &self.forward_paired,
            &self.reverse_paired,
        )
    }
}

fn adapters(config: &PipelineConfig) -> Result<&Path, ToolFailure> {
    config
        .references
        .adapters
        .as_deref()
        .ok_or_else(|| ToolFailure::Misconfigured("references.adapters".to_string()))
}

/// Returns true if `path` names a Java archive, which runs through `java -jar`.
#[must_use]
pub fn is_jar(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
}

/// Trimmomatic in paired-end mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trimmomatic;

impl CommandTool for Trimmomatic {
    fn tool_name(&self) -> &'static str {
        "trimmomatic"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.trimmomatic.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let (forward, reverse) = ctx.input_pair(ArtifactKind::RawReads)?;
        let adapters = adapters(ctx.config)?;
        let trimming = &ctx.config.trimming;
        let out = TrimmedPaths::new(ctx);

        let program = &ctx.config.tools.trimmomatic;
        let command = if is_jar(program) {
            ToolCommand::new(&ctx.config.tools.java).arg("-jar").arg(program)
        } else {
            ToolCommand::new(program)
        };

        let mut clip = OsString::from("ILLUMINACLIP:");
        clip.push(adapters);
        clip.push(format!(":{}", trimming.illuminaclip));

        let mut command = command
            .args(["PE", "-phred33", "-threads"])
            .arg(ctx.threads())
            .args([
                forward,
                reverse,
                out.forward_paired.as_path(),
                out.forward_unpaired.as_path(),
                out.reverse_paired.as_path(),
                out.reverse_unpaired.as_path(),
            ])
            .arg(clip)
            .arg(format!("LEADING:{}", trimming.leading))
            .arg(format!("TRAILING:{}", trimming.trailing))
            .arg(format!("SLIDINGWINDOW:{}", trimming.sliding_window))
            .arg(format!("MINLEN:{}", trimming.min_len));
        if let Some(crop) = trimming.crop {
            command = command.arg(format!("CROP:{crop}"));
        }
        if let Some(headcrop) = trimming.headcrop {
            command = command.arg(format!("HEADCROP:{headcrop}"));
        }

        Ok(command
            .output(out.artifact())
            .timeout(secs(ctx.config.timeouts.trimming_secs)))
    }
}

/// BBDuk adapter and quality trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct BbDuk;

impl CommandTool for BbDuk {
    fn tool_name(&self) -> &'static str {
        "bbduk"
    }

    fn executable(&self, config: &PipelineConfig) -> PathBuf {
        config.tools.bbduk.clone()
    }

    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure> {
        let (forward, reverse) = ctx.input_pair(ArtifactKind::RawReads)?;
        let adapters = adapters(ctx.config)?;
        let opts = &ctx.config.trimming.bbduk;
        let out = TrimmedPaths::new(ctx);

        Ok(ToolCommand::new(&ctx.config.tools.bbduk)
            .kv("in1", forward)
            .kv("in2", reverse)
            .kv("out1", &out.forward_paired)
            .kv("out2", &out.reverse_paired)
            .kv("ref", adapters)
            .kv("ktrim", &opts.ktrim)
            .kv("k", opts.k.to_string())
            .kv("mink", opts.mink.to_string())
            .kv("hdist", opts.hdist.to_string())
            .kv("tpe", &opts.tpe)
            .kv("tbo", &opts.tbo)
            .kv("qtrim", &opts.qtrim)
            .kv("trimq", opts.trimq.to_string())
            .kv("minlen", ctx.config.trimming.min_len.to_string())
            .kv("threads", ctx.threads())
            .kv("overwrite", "t")
            .output(out.artifact())
            .timeout(secs(ctx.config.timeouts.trimming_secs)))
    }
}
