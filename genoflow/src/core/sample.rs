//! The per-sample unit of work.

use super::{Artifact, ArtifactKind};
use crate::stages::StageResult;
use std::path::{Path, PathBuf};

/// One paired forward/reverse read set and its stage ledger.
///
/// The ledger is append-only: results are recorded by the sample pipeline in
/// stage order and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    raw_reads: Artifact,
    output_dir: PathBuf,
    results: Vec<StageResult>,
}

impl Sample {
    /// Creates a sample whose outputs live under `output_dir`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        forward: impl Into<PathBuf>,
        reverse: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            raw_reads: Artifact::pair(ArtifactKind::RawReads, forward, reverse),
            output_dir: output_dir.into(),
            results: Vec::new(),
        }
    }

    /// Returns the sample name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the forward read file.
    #[must_use]
    pub fn forward(&self) -> &Path {
        &self.raw_reads.paths[0]
    }

    /// Returns the reverse read file.
    #[must_use]
    pub fn reverse(&self) -> &Path {
        &self.raw_reads.paths[1]
    }

    /// Returns the sample's output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the directory a stage writes into.
    #[must_use]
    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.output_dir.join(stage)
    }

    /// Looks up the most recent artifact of `kind`.
    ///
    /// Raw reads always resolve to the input pair; other kinds resolve from
    /// successful stage results only.
    #[must_use]
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        if kind == ArtifactKind::RawReads {
            return Some(&self.raw_reads);
        }
        self.results
            .iter()
            .rev()
            .filter(|r| r.status.is_success())
            .find_map(|r| r.artifact(kind))
    }

    /// Returns the stage ledger.
    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    pub(crate) fn record(&mut self, result: StageResult) {
        self.results.push(result);
    }
}
