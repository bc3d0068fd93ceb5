//! The per-sample stage sequence.

use super::SampleReport;
use crate::core::Sample;
use crate::events::types;
use crate::stages::{aborted_reason, StageDefinition, StageResult, StageRunner, UPSTREAM_REQUIRED_FAILED};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Runs the ordered stages of the topology for one sample at a time.
///
/// Once a required stage fails or is skipped, every later stage is recorded
/// as skipped with [`UPSTREAM_REQUIRED_FAILED`]. Once the run is aborted,
/// stages that have not started are recorded as skipped with the abort reason.
/// Either way the ledger holds exactly one result per stage.
#[derive(Debug, Clone)]
pub struct SamplePipeline {
    stages: Arc<[StageDefinition]>,
    runner: StageRunner,
}

impl SamplePipeline {
    /// Creates a pipeline over `stages`.
    #[must_use]
    pub fn new(stages: impl Into<Arc<[StageDefinition]>>, runner: StageRunner) -> Self {
        Self {
            stages: stages.into(),
            runner,
        }
    }

    /// Returns the stage topology.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Runs every stage for `sample` and returns its report.
    pub async fn run(&self, sample: Sample) -> SampleReport {
        let span = tracing::info_span!("sample", sample = %sample.name());
        self.run_inner(sample).instrument(span).await
    }

    async fn run_inner(&self, mut sample: Sample) -> SampleReport {
        let mut blocked = false;

        for stage in self.stages.iter() {
            let result = if let Some(reason) = self.runner.cancel_token().reason() {
                StageResult::skipped(&stage.name, aborted_reason(&reason))
            } else if blocked {
                StageResult::skipped(&stage.name, UPSTREAM_REQUIRED_FAILED)
            } else {
                let result = self.runner.run(stage, &sample).await;
                if stage.required && !result.status.is_success() {
                    warn!(stage = %stage.name, status = %result.status, "Required stage did not succeed, skipping the rest");
                    blocked = true;
                }
                result
            };
            sample.record(result);
        }

        let report = SampleReport::from_ledger(&sample, &self.stages);
        info!(status = %report.status, "Sample finished");
        self.runner.events().emit(
            types::SAMPLE_COMPLETED,
            Some(json!({
                "sample": report.sample,
                "status": report.status,
            })),
        );
        report
    }
}
