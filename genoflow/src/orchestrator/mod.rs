//! Run orchestration.
//!
//! The [`Orchestrator`] validates the run, checks dependencies, discovers
//! samples, drives a [`SamplePipeline`] per sample with bounded parallelism,
//! aggregates the reports into a [`RunSummary`], and finally runs MultiQC
//! over the output tree.

mod aggregate;
mod preflight;
mod summary;

pub use aggregate::{multiqc_command, run_multiqc, AggregateReport, MULTIQC, MULTIQC_DIR};
pub use preflight::{resolve_program, DependencyCheck, DependencyReport, DependencyStatus};
pub use summary::{RunSummary, SampleCounts, SUMMARY_FILE};

use crate::cancellation::CancellationToken;
use crate::config::{secs, PipelineConfig};
use crate::discovery::FilePairMatcher;
use crate::errors::GenoflowError;
use crate::events::{EventSink, LoggingEventSink};
use crate::pipeline::{SamplePipeline, SampleReport};
use crate::stages::{default_topology, validate_topology, StageDefinition, StageRunner};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reason recorded when the run timeout expires.
pub const RUN_TIMEOUT_REASON: &str = "run timeout";

/// Drives the sample pipeline across all discovered samples.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    stages: Arc<[StageDefinition]>,
    cancel: Arc<CancellationToken>,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator over the default topology for `config`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let stages = default_topology(&config);
        Self {
            config: Arc::new(config),
            stages: stages.into(),
            cancel: Arc::new(CancellationToken::new()),
            events: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Replaces the stage topology.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<StageDefinition>) -> Self {
        self.stages = stages.into();
        self
    }

    /// Shares an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the stage topology.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Returns the run cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> Arc<CancellationToken> {
        self.cancel.clone()
    }

    /// Validates the configuration and topology, then checks every tool.
    ///
    /// Never touches the filesystem beyond reading it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration or topology is
    /// invalid. Missing tools are reported in the returned report, not as
    /// an error.
    pub fn check_dependencies(&self) -> Result<DependencyReport, GenoflowError> {
        dependency_report(&self.config, &self.stages)
    }

    /// Runs every discovered sample of `input_dir` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, raised before the output directory is
    /// touched, if the configuration is invalid, a required tool is missing or
    /// the input directory cannot be read. Returns an IO error if the output
    /// directory or the summary cannot be written. Sample failures are never
    /// errors; they are reported in the summary.
    ///
    /// Relative directories and tool paths are resolved against the current
    /// directory before anything runs.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary, GenoflowError> {
        let started_at = Utc::now();
        let base = std::env::current_dir().map_err(|e| GenoflowError::io(".", e))?;
        let input_root = base.join(input_dir);
        let output_root = base.join(output_dir);
        let (input_dir, output_dir) = (input_root.as_path(), output_root.as_path());
        let mut config = (*self.config).clone();
        config.anchor_relative_paths(&base);
        let config = Arc::new(config);

        let dependencies = dependency_report(&config, &self.stages)?;
        dependencies.ensure_satisfied()?;

        let matcher = FilePairMatcher::new(config.discovery.clone())?;
        let discovery = matcher.discover(input_dir)?;
        let samples: Vec<_> = discovery.samples(output_dir).collect();
        let (_, warnings) = discovery.into_parts();
        if samples.is_empty() {
            warn!(input = %input_dir.display(), "No read pairs found");
        }

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| GenoflowError::io(output_dir, e))?;

        let workers = config.worker_count();
        info!(
            samples = samples.len(),
            stages = self.stages.len(),
            workers,
            "Starting run"
        );

        let watchdog = secs(config.timeouts.run_secs).map(|limit| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!(limit_secs = limit.as_secs(), "Run timeout reached, aborting");
                cancel.cancel(RUN_TIMEOUT_REASON);
            })
        });

        let runner = StageRunner::new(config.clone(), self.cancel.clone(), self.events.clone());
        let pipeline = SamplePipeline::new(self.stages.clone(), runner);

        let reports: Vec<SampleReport> = stream::iter(samples)
            .map(|sample| {
                let pipeline = pipeline.clone();
                let name = sample.name().to_string();
                let handle = tokio::spawn(async move {
                    if let Err(e) = tokio::fs::create_dir_all(sample.output_dir()).await {
                        let path = sample.output_dir().display().to_string();
                        return SampleReport::failed(sample.name(), format!("cannot create {path}: {e}"));
                    }
                    pipeline.run(sample).await
                });
                async move {
                    match handle.await {
                        Ok(report) => report,
                        Err(e) => {
                            error!(sample = %name, error = %e, "Sample pipeline panicked");
                            SampleReport::failed(name, "sample pipeline panicked")
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let aggregate = if config.stages.multiqc && !reports.is_empty() {
            Some(run_multiqc(dependencies.resolved(MULTIQC), output_dir, &config, &self.cancel).await)
        } else {
            None
        };

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let mut summary = RunSummary::new(
            input_dir,
            output_dir,
            started_at,
            reports,
            warnings,
            self.cancel.reason(),
        );
        summary.aggregate = aggregate;
        let path = summary.write(output_dir)?;
        info!(path = %path.display(), "Wrote run summary");
        summary.log_table();
        Ok(summary)
    }
}

fn dependency_report(config: &PipelineConfig, stages: &[StageDefinition]) -> Result<DependencyReport, GenoflowError> {
    config.validate()?;
    validate_topology(stages)?;
    Ok(DependencyReport::check(stages, config))
}
