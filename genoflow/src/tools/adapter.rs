//! The tool adapter capability.

use super::outcome::{ToolFailure, ToolOutcome};
use super::process;
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{Artifact, ArtifactKind, Sample};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a tool invocation may depend on.
///
/// Adapters build their command line from these fields only.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    /// The sample being processed.
    pub sample: &'a Sample,
    /// Name of the running stage.
    pub stage: &'a str,
    /// Directory the stage writes into. Exists when the adapter is invoked.
    pub stage_dir: &'a Path,
    /// Run configuration.
    pub config: &'a PipelineConfig,
    /// Artifacts produced by earlier adapters of the same stage.
    pub staged: &'a [Artifact],
    /// Run-level abort signal.
    pub cancel: &'a CancellationToken,
}

impl<'a> ToolContext<'a> {
    /// Looks up an input artifact, preferring ones produced earlier in this stage.
    #[must_use]
    pub fn input(&self, kind: ArtifactKind) -> Option<&'a Artifact> {
        self.staged
            .iter()
            .rev()
            .find(|a| a.kind == kind)
            .or_else(|| self.sample.artifact(kind))
    }

    /// Looks up a single-file input artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ToolFailure::MissingInput`] if it is not available.
    pub fn input_file(&self, kind: ArtifactKind) -> Result<&'a Path, ToolFailure> {
        self.input(kind)
            .and_then(Artifact::primary)
            .ok_or(ToolFailure::MissingInput(kind))
    }

    /// Looks up a read-pair input artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ToolFailure::MissingInput`] if it is not available.
    pub fn input_pair(&self, kind: ArtifactKind) -> Result<(&'a Path, &'a Path), ToolFailure> {
        self.input(kind)
            .and_then(Artifact::as_pair)
            .ok_or(ToolFailure::MissingInput(kind))
    }

    /// Returns `<stage_dir>/<sample><suffix>`.
    #[must_use]
    pub fn sample_file(&self, suffix: &str) -> PathBuf {
        self.stage_dir.join(format!("{}{suffix}", self.sample.name()))
    }

    /// Returns the per-tool thread count as a string argument.
    #[must_use]
    pub fn threads(&self) -> String {
        self.config.resources.threads.to_string()
    }
}

/// Wraps one external executable.
///
/// Implementations never panic or return errors for tool problems; every
/// failure is reported through [`ToolOutcome::failure`].
#[async_trait]
pub trait ToolAdapter: Send + Sync + Debug {
    /// Returns the tool name used in logs, reasons and the log file name.
    fn name(&self) -> &str;

    /// Returns the executable the dependency pre-flight should check, if any.
    fn program(&self, config: &PipelineConfig) -> Option<PathBuf>;

    /// Runs the tool for the sample in `ctx`.
    async fn invoke(&self, ctx: &ToolContext<'_>) -> ToolOutcome;
}

/// A fully built command line plus the outputs it promises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable to start.
    pub program: PathBuf,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Outputs that must exist and be non-empty after a zero exit.
    pub declared_outputs: Vec<Artifact>,
    /// Kill the process after this long.
    pub timeout: Option<Duration>,
}

impl ToolCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            declared_outputs: Vec::new(),
            timeout: None,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Appends a `key=value` argument, keeping non UTF-8 paths intact.
    #[must_use]
    pub fn kv(self, key: &str, value: impl AsRef<OsStr>) -> Self {
        let mut arg = OsString::from(key);
        arg.push("=");
        arg.push(value);
        self.arg(arg)
    }

    /// Declares an output artifact.
    #[must_use]
    pub fn output(mut self, artifact: Artifact) -> Self {
        self.declared_outputs.push(artifact);
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Renders the command line for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A tool that is run as a single external command.
///
/// Every type implementing this trait is a [`ToolAdapter`] that builds its
/// command, runs it through [`process::execute`], and verifies the declared
/// outputs.
pub trait CommandTool: Send + Sync + Debug {
    /// Tool name.
    fn tool_name(&self) -> &'static str;

    /// The configured executable.
    fn executable(&self, config: &PipelineConfig) -> PathBuf;

    /// Builds the command line.
    ///
    /// # Errors
    ///
    /// Returns a failure if an input artifact is not available.
    fn command(&self, ctx: &ToolContext<'_>) -> Result<ToolCommand, ToolFailure>;
}

#[async_trait]
impl<T: CommandTool> ToolAdapter for T {
    fn name(&self) -> &str {
        self.tool_name()
    }

    fn program(&self, config: &PipelineConfig) -> Option<PathBuf> {
        Some(self.executable(config))
    }

    async fn invoke(&self, ctx: &ToolContext<'_>) -> ToolOutcome {
        let command = match self.command(ctx) {
            Ok(command) => command,
            Err(failure) => return ToolOutcome::failed(self.tool_name(), failure),
        };
        let log_path = ctx.stage_dir.join(format!("{}.log", self.tool_name()));
        process::execute(
            self.tool_name(),
            &command,
            &log_path,
            ctx.config.stderr_tail_lines,
            ctx.cancel,
        )
        .await
    }
}
