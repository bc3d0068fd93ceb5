//! Running one stage for one sample.

use super::marker::{fingerprint, CompletionMarker};
use super::result::{aborted_reason, StageResult, MISSING_PREREQUISITE};
use super::StageDefinition;
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{Artifact, Sample};
use crate::events::{types, EventSink};
use crate::tools::{ToolContext, ToolFailure};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Executes stage definitions against samples.
///
/// The runner never returns an error: every outcome, including an aborted
/// run, becomes a [`StageResult`].
#[derive(Debug, Clone)]
pub struct StageRunner {
    config: Arc<PipelineConfig>,
    cancel: Arc<CancellationToken>,
    events: Arc<dyn EventSink>,
}

impl StageRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        config: Arc<PipelineConfig>,
        cancel: Arc<CancellationToken>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            cancel,
            events,
        }
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the run cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    /// Runs `stage` for `sample`.
    pub async fn run(&self, stage: &StageDefinition, sample: &Sample) -> StageResult {
        let span = tracing::info_span!("stage", sample = %sample.name(), stage = %stage.name);
        self.run_inner(stage, sample).instrument(span).await
    }

    async fn run_inner(&self, stage: &StageDefinition, sample: &Sample) -> StageResult {
        let started_at = Utc::now();
        let name = stage.name.as_str();

        if let Some(reason) = self.cancel.reason() {
            return self.finish(sample, StageResult::failed(name, started_at, aborted_reason(&reason)));
        }

        let mut inputs: Vec<&Artifact> = Vec::with_capacity(stage.required_inputs.len());
        for kind in &stage.required_inputs {
            match sample.artifact(*kind) {
                Some(artifact) if artifact.is_intact() => inputs.push(artifact),
                _ => {
                    info!(input = %kind, "Prerequisite artifact missing, skipping stage");
                    return self.finish(sample, StageResult::skipped(name, MISSING_PREREQUISITE));
                }
            }
        }

        let stage_dir = sample.stage_dir(name);
        let fingerprint = fingerprint(stage, &self.config, &inputs);
        if let Some(marker) = CompletionMarker::load(&stage_dir) {
            if marker.is_valid_for(&fingerprint) {
                info!("Stage already complete, reusing outputs");
                return self.finish(sample, StageResult::reused(name, marker.artifacts));
            }
            CompletionMarker::clear(&stage_dir);
        }

        if let Err(e) = tokio::fs::create_dir_all(&stage_dir).await {
            let reason = format!("cannot create {}: {e}", stage_dir.display());
            return self.finish(sample, StageResult::failed(name, started_at, reason));
        }

        self.emit(types::STAGE_STARTED, sample, name, json!({}));
        debug!(adapters = ?stage.adapter_names(), "Stage started");

        let mut staged: Vec<Artifact> = Vec::new();
        let mut last_tool = None;
        let mut last_exit = None;
        for adapter in &stage.adapters {
            let tool = adapter.name();
            self.emit(types::TOOL_STARTED, sample, name, json!({ "tool": tool }));

            let ctx = ToolContext {
                sample,
                stage: name,
                stage_dir: &stage_dir,
                config: &self.config,
                staged: &staged,
                cancel: &self.cancel,
            };
            let outcome = adapter.invoke(&ctx).await;

            self.emit(
                types::TOOL_COMPLETED,
                sample,
                name,
                json!({
                    "tool": tool,
                    "success": outcome.is_success(),
                    "exit_code": outcome.exit_code,
                    "duration_ms": outcome.duration_ms,
                }),
            );

            if let Some(failure) = &outcome.failure {
                let reason = match failure {
                    ToolFailure::Aborted(reason) => aborted_reason(reason),
                    _ => outcome.reason().unwrap_or_default(),
                };
                warn!(tool, exit_code = ?outcome.exit_code, %failure, "Tool failed");
                let result = StageResult::failed(name, started_at, reason)
                    .with_tool(tool)
                    .with_exit_code(outcome.exit_code);
                return self.finish(sample, result);
            }

            debug!(tool, duration_ms = outcome.duration_ms, "Tool succeeded");
            staged.extend(outcome.produced);
            last_tool = Some(tool);
            last_exit = outcome.exit_code;
        }

        for kind in &stage.outputs {
            match staged.iter().rev().find(|a| a.kind == *kind) {
                Some(artifact) if artifact.is_intact() => {}
                _ => {
                    let reason = format!("stage did not produce {kind}");
                    let mut result = StageResult::failed(name, started_at, reason);
                    if let Some(tool) = last_tool {
                        result = result.with_tool(tool);
                    }
                    return self.finish(sample, result);
                }
            }
        }

        let marker = CompletionMarker::new(name, fingerprint, staged.clone());
        if let Err(e) = marker.write(&stage_dir) {
            warn!(error = %e, "Cannot write completion marker; the stage will rerun next time");
        }

        let mut result = StageResult::success(name, started_at, staged).with_exit_code(last_exit);
        if let Some(tool) = last_tool {
            result = result.with_tool(tool);
        }
        self.finish(sample, result)
    }

    fn finish(&self, sample: &Sample, result: StageResult) -> StageResult {
        let event = if result.reused {
            types::STAGE_REUSED
        } else if result.status.is_success() {
            types::STAGE_COMPLETED
        } else if result.status.is_failure() {
            types::STAGE_FAILED
        } else {
            types::STAGE_SKIPPED
        };
        self.emit(
            event,
            sample,
            &result.stage,
            json!({
                "status": result.status,
                "reason": result.reason,
                "tool": result.tool,
                "duration_ms": result.duration_ms(),
            }),
        );
        if result.status.is_success() {
            info!(duration_ms = result.duration_ms(), reused = result.reused, "Stage succeeded");
        }
        result
    }

    fn emit(&self, event_type: &str, sample: &Sample, stage: &str, mut data: serde_json::Value) {
        if let Some(obj) = data.as_object_mut() {
            obj.insert("sample".to_string(), json!(sample.name()));
            obj.insert("stage".to_string(), json!(stage));
        }
        self.events.emit(event_type, Some(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, StageStatus};
    use crate::events::CollectingEventSink;
    use crate::testing::{write_fastq_pair, ScriptedTool};
    use pretty_assertions::assert_eq;

    struct Fixture {
        _dir: tempfile::TempDir,
        sample: Sample,
        events: Arc<CollectingEventSink>,
        cancel: Arc<CancellationToken>,
        runner: StageRunner,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let (forward, reverse) = write_fastq_pair(dir.path(), "A");
        let sample = Sample::new("A", forward, reverse, dir.path().join("out/A"));
        let events = Arc::new(CollectingEventSink::new());
        let cancel = Arc::new(CancellationToken::new());
        let runner = StageRunner::new(
            Arc::new(PipelineConfig::default()),
            cancel.clone(),
            events.clone(),
        );
        Fixture {
            _dir: dir,
            sample,
            events,
            cancel,
            runner,
        }
    }

    fn assembly(tool: ScriptedTool) -> StageDefinition {
        StageDefinition::new("assembly")
            .with_input(ArtifactKind::RawReads)
            .with_output(ArtifactKind::Contigs)
            .with_adapter(tool)
    }

    #[tokio::test]
    async fn test_success_records_artifacts_and_marker() {
        let f = fixture();
        let tool = ScriptedTool::new("spades").produces(ArtifactKind::Contigs, &["contigs.fasta"]);
        let stage = assembly(tool.clone());

        let result = f.runner.run(&stage, &f.sample).await;

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.tool.as_deref(), Some("spades"));
        let contigs = result.artifact(ArtifactKind::Contigs).unwrap();
        assert_eq!(contigs.primary(), Some(f.sample.stage_dir("assembly").join("contigs.fasta").as_path()));
        assert!(CompletionMarker::path(&f.sample.stage_dir("assembly")).exists());
        assert_eq!(tool.call_count(), 1);
        assert_eq!(
            f.events.event_types(),
            vec!["stage.started", "tool.started", "tool.completed", "stage.completed"]
        );
    }

    #[tokio::test]
    async fn test_missing_prerequisite_skips_without_invoking() {
        let f = fixture();
        let tool = ScriptedTool::new("reformat");
        let stage = StageDefinition::new("contig_filter")
            .with_input(ArtifactKind::Contigs)
            .with_adapter(tool.clone());

        let result = f.runner.run(&stage, &f.sample).await;

        assert_eq!(result.status, StageStatus::Skipped);
        assert_eq!(result.reason.as_deref(), Some(MISSING_PREREQUISITE));
        assert_eq!(tool.call_count(), 0);
        assert!(!f.sample.stage_dir("contig_filter").exists());
    }

    #[tokio::test]
    async fn test_tool_failure_includes_tool_and_stderr() {
        let f = fixture();
        let stage = assembly(
            ScriptedTool::new("spades")
                .fails(ToolFailure::NonZeroExit(255))
                .with_stderr("== Error == system call for: ... finished abnormally"),
        );

        let result = f.runner.run(&stage, &f.sample).await;

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.exit_code, Some(255));
        assert_eq!(result.tool.as_deref(), Some("spades"));
        let reason = result.reason.unwrap();
        assert!(reason.starts_with("spades exited with status 255"));
        assert!(reason.contains("finished abnormally"));
        assert!(!CompletionMarker::path(&f.sample.stage_dir("assembly")).exists());
    }

    #[tokio::test]
    async fn test_later_adapter_not_run_after_failure() {
        let f = fixture();
        let trimmer = ScriptedTool::new("trimmomatic").fails(ToolFailure::NonZeroExit(1));
        let qc = ScriptedTool::new("fastqc");
        let stage = StageDefinition::new("quality_control")
            .with_input(ArtifactKind::RawReads)
            .with_adapter(trimmer.clone())
            .with_adapter(qc.clone());

        let result = f.runner.run(&stage, &f.sample).await;

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(trimmer.call_count(), 1);
        assert_eq!(qc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_declared_stage_output_fails() {
        let f = fixture();
        let stage = assembly(ScriptedTool::new("spades"));

        let result = f.runner.run(&stage, &f.sample).await;

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.reason.as_deref(), Some("stage did not produce contigs"));
    }

    #[tokio::test]
    async fn test_rerun_reuses_marker() {
        let f = fixture();
        let tool = ScriptedTool::new("spades").produces(ArtifactKind::Contigs, &["contigs.fasta"]);
        let stage = assembly(tool.clone());

        let first = f.runner.run(&stage, &f.sample).await;
        let second = f.runner.run(&stage, &f.sample).await;

        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(second.status, StageStatus::Success);
        assert_eq!(second.artifacts, first.artifacts);
        assert_eq!(tool.call_count(), 1);
        assert_eq!(f.events.events_of_type("stage.reused").len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_after_artifact_removed() {
        let f = fixture();
        let tool = ScriptedTool::new("spades").produces(ArtifactKind::Contigs, &["contigs.fasta"]);
        let stage = assembly(tool.clone());

        f.runner.run(&stage, &f.sample).await;
        std::fs::remove_file(f.sample.stage_dir("assembly").join("contigs.fasta")).unwrap();
        let second = f.runner.run(&stage, &f.sample).await;

        assert!(!second.reused);
        assert_eq!(tool.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let f = fixture();
        let tool = ScriptedTool::new("spades");
        f.cancel.cancel("operator interrupt");

        let result = f.runner.run(&assembly(tool.clone()), &f.sample).await;

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.reason.as_deref(), Some("run aborted: operator interrupt"));
        assert_eq!(tool.call_count(), 0);
    }

    #[tokio::test]
    async fn test_aborted_tool_reason() {
        let f = fixture();
        let stage = assembly(
            ScriptedTool::new("spades").fails(ToolFailure::Aborted("run timeout".to_string())),
        );

        let result = f.runner.run(&stage, &f.sample).await;
        assert_eq!(result.reason.as_deref(), Some("run aborted: run timeout"));
    }
}
