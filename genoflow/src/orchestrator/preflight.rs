//! Dependency pre-flight.
//!
//! Resolves every external tool the topology would invoke and reports whether
//! it is present and executable. The check only reads the filesystem.

use super::aggregate::MULTIQC;
use crate::config::PipelineConfig;
use crate::errors::ConfigError;
use crate::stages::StageDefinition;
use crate::tools::adapters::is_jar;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Resolution state of one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    /// The tool resolved to this file.
    Found(PathBuf),
    /// No file was found.
    Missing,
    /// A file was found but has no execute permission.
    NotExecutable(PathBuf),
}

impl DependencyStatus {
    /// Returns true if the tool can be run.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(path) => write!(f, "ok ({})", path.display()),
            Self::Missing => write!(f, "MISSING"),
            Self::NotExecutable(path) => write!(f, "NOT EXECUTABLE ({})", path.display()),
        }
    }
}

/// Pre-flight result for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCheck {
    /// Tool name.
    pub tool: String,
    /// Configured program.
    pub program: PathBuf,
    /// Whether an enabled required stage needs the tool.
    pub required: bool,
    /// Resolution state.
    pub status: DependencyStatus,
    /// First line of `--version` output, when queried.
    pub version: Option<String>,
}

/// Structured pass/fail list of the topology's external tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    checks: Vec<DependencyCheck>,
}

impl DependencyReport {
    /// Checks every tool of `stages`, searching the process `PATH`.
    #[must_use]
    pub fn check(stages: &[StageDefinition], config: &PipelineConfig) -> Self {
        let path = std::env::var_os("PATH");
        Self::check_with_path(stages, config, path.as_deref())
    }

    /// Checks every tool of `stages` against an explicit search path.
    ///
    /// MultiQC is checked as an optional tool when the run-level report is
    /// enabled.
    #[must_use]
    pub fn check_with_path(
        stages: &[StageDefinition],
        config: &PipelineConfig,
        search_path: Option<&OsStr>,
    ) -> Self {
        let mut report = Self::default();
        for stage in stages {
            for adapter in &stage.adapters {
                let Some(program) = adapter.program(config) else {
                    continue;
                };
                if is_jar(&program) {
                    report.add("java", &config.tools.java, stage.required, search_path);
                }
                report.add(adapter.name(), &program, stage.required, search_path);
            }
        }
        if config.stages.multiqc {
            report.add(MULTIQC, &config.tools.multiqc, false, search_path);
        }
        report
    }

    fn add(&mut self, tool: &str, program: &Path, required: bool, search_path: Option<&OsStr>) {
        if let Some(existing) = self.checks.iter_mut().find(|c| c.tool == tool) {
            existing.required |= required;
            return;
        }
        let status = if is_jar(program) {
            match std::fs::metadata(program) {
                Ok(meta) if meta.is_file() => DependencyStatus::Found(program.to_path_buf()),
                _ => DependencyStatus::Missing,
            }
        } else {
            resolve_program(program, search_path)
        };
        debug!(tool, program = %program.display(), %status, "Resolved tool");
        self.checks.push(DependencyCheck {
            tool: tool.to_string(),
            program: program.to_path_buf(),
            required,
            status,
            version: None,
        });
    }

    /// Returns all checks, in topology order.
    #[must_use]
    pub fn checks(&self) -> &[DependencyCheck] {
        &self.checks
    }

    /// Returns the resolved executable of `tool`, if it was found.
    #[must_use]
    pub fn resolved(&self, tool: &str) -> Option<&Path> {
        self.checks
            .iter()
            .find(|c| c.tool == tool)
            .and_then(|c| match &c.status {
                DependencyStatus::Found(path) => Some(path.as_path()),
                _ => None,
            })
    }

    /// Returns the required tools that cannot be run.
    pub fn failures(&self) -> impl Iterator<Item = &DependencyCheck> {
        self.checks
            .iter()
            .filter(|c| c.required && !c.status.is_found())
    }

    /// Returns true if every required tool can be run.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Converts failing required tools into a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTools`] naming every failing required tool.
    pub fn ensure_satisfied(&self) -> Result<(), ConfigError> {
        let tools: Vec<String> = self.failures().map(|c| c.tool.clone()).collect();
        if tools.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingTools { tools })
        }
    }

    /// Runs `<program> --version` for every found tool and records the first
    /// output line. Tools that do not answer within `timeout` get no version.
    pub async fn query_versions(&mut self, timeout: Duration) {
        let queries = self.checks.iter().map(|check| async move {
            match &check.status {
                DependencyStatus::Found(path) if !is_jar(path) => query_version(path, timeout).await,
                _ => None,
            }
        });
        let versions = futures::future::join_all(queries).await;
        for (check, version) in self.checks.iter_mut().zip(versions) {
            check.version = version;
        }
    }
}

impl fmt::Display for DependencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            write!(f, "{:<12} {}", check.tool, check.status)?;
            if !check.required {
                write!(f, " [optional]")?;
            }
            if let Some(version) = &check.version {
                write!(f, " {version}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Resolves a configured program.
///
/// A program with more than one path component is checked as given; a bare
/// name is searched in each directory of `search_path`.
#[must_use]
pub fn resolve_program(program: &Path, search_path: Option<&OsStr>) -> DependencyStatus {
    if program.components().count() > 1 {
        return check_candidate(program);
    }
    let Some(search_path) = search_path else {
        return DependencyStatus::Missing;
    };

    let mut not_executable = None;
    for dir in std::env::split_paths(search_path) {
        match check_candidate(&dir.join(program)) {
            found @ DependencyStatus::Found(_) => return found,
            DependencyStatus::NotExecutable(path) => {
                not_executable.get_or_insert(path);
            }
            DependencyStatus::Missing => {}
        }
    }
    not_executable.map_or(DependencyStatus::Missing, DependencyStatus::NotExecutable)
}

fn check_candidate(path: &Path) -> DependencyStatus {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            if is_executable(&meta) {
                DependencyStatus::Found(path.to_path_buf())
            } else {
                DependencyStatus::NotExecutable(path.to_path_buf())
            }
        }
        _ => DependencyStatus::Missing,
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

async fn query_version(program: &Path, timeout: Duration) -> Option<String> {
    let mut command = Command::new(program);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let output = tokio::time::timeout(timeout, command.output())
        .await
        .ok()?
        .ok()?;

    // Several tools print their version to stderr.
    let text = [&output.stdout, &output.stderr]
        .into_iter()
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .find(|text| !text.is_empty());
    text.and_then(|text| text.lines().next().map(str::to_string))
}
