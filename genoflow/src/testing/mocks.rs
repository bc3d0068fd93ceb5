//! Mock tool adapters for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::core::{Artifact, ArtifactKind};
use crate::tools::process::verify_outputs;
use crate::tools::{ToolAdapter, ToolContext, ToolFailure, ToolOutcome};

/// A tool adapter that follows a script instead of running a process.
///
/// It writes the files it declares into the stage directory, then reports
/// success or the scripted failure. Clones share call tracking, so a test can
/// keep a handle after moving the adapter into a stage definition.
#[derive(Debug, Clone)]
pub struct ScriptedTool {
    name: String,
    outputs: Vec<(ArtifactKind, Vec<String>)>,
    content: Vec<u8>,
    failure: Option<ToolFailure>,
    failing_samples: Vec<String>,
    stderr: String,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTool {
    /// Creates a tool that succeeds without producing anything.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: Vec::new(),
            content: b">contig_1\nACGTACGTACGT\n".to_vec(),
            failure: None,
            failing_samples: Vec::new(),
            stderr: String::new(),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Declares an output artifact made of `files`, relative to the stage
    /// directory.
    #[must_use]
    pub fn produces(mut self, kind: ArtifactKind, files: &[&str]) -> Self {
        self.outputs
            .push((kind, files.iter().map(|f| (*f).to_string()).collect()));
        self
    }

    /// Writes the declared files with zero length.
    #[must_use]
    pub fn empty_output(mut self) -> Self {
        self.content.clear();
        self
    }

    /// Fails every invocation.
    #[must_use]
    pub fn fails(mut self, failure: ToolFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Fails invocations for `sample` only.
    #[must_use]
    pub fn fails_for(mut self, sample: impl Into<String>, failure: ToolFailure) -> Self {
        self.failing_samples.push(sample.into());
        self.failure = Some(failure);
        self
    }

    /// Sets the stderr tail reported on failure.
    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Sleeps before producing outputs. The sleep ends early if the run is
    /// aborted.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the sample names of each invocation, in call order.
    #[must_use]
    pub fn invoked_samples(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn scripted_failure(&self, sample: &str) -> Option<ToolFailure> {
        let applies =
            self.failing_samples.is_empty() || self.failing_samples.iter().any(|s| s == sample);
        self.failure.clone().filter(|_| applies)
    }
}

#[async_trait]
impl ToolAdapter for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self, _config: &PipelineConfig) -> Option<PathBuf> {
        None
    }

    async fn invoke(&self, ctx: &ToolContext<'_>) -> ToolOutcome {
        self.calls.lock().push(ctx.sample.name().to_string());

        if let Some(delay) = self.delay {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = ctx.cancel.cancelled() => {
                    let reason = ctx.cancel.reason().unwrap_or_default();
                    return ToolOutcome::failed(&self.name, ToolFailure::Aborted(reason));
                }
            }
        }

        if let Some(failure) = self.scripted_failure(ctx.sample.name()) {
            return ToolOutcome::failed(&self.name, failure).with_stderr_tail(self.stderr.clone());
        }

        let mut declared = Vec::with_capacity(self.outputs.len());
        for (kind, files) in &self.outputs {
            let mut paths = Vec::with_capacity(files.len());
            for file in files {
                let path = ctx.stage_dir.join(file);
                if let Err(e) = std::fs::write(&path, &self.content) {
                    return ToolOutcome::failed(&self.name, ToolFailure::Spawn(e.to_string()));
                }
                paths.push(path);
            }
            declared.push(Artifact::new(*kind, paths));
        }
        verify_outputs(&self.name, &declared)
    }
}
