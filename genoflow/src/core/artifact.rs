//! Artifacts passed between stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of file set a stage consumes or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The sample's input read pair.
    RawReads,
    /// Adapter/quality trimmed read pair.
    TrimmedReads,
    /// Per-read-file quality report over the untrimmed reads.
    RawReadQcReport,
    /// Per-read-file quality report.
    ReadQcReport,
    /// Assembled contigs.
    Contigs,
    /// Contigs above the minimum length.
    FilteredContigs,
    /// Assembly evaluation report.
    AssemblyReport,
    /// Genome annotation.
    Annotation,
    /// Read coverage statistics against the filtered contigs.
    Coverage,
    /// Run-level MultiQC report over every sample.
    MultiQcReport,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RawReads => "raw_reads",
            Self::TrimmedReads => "trimmed_reads",
            Self::RawReadQcReport => "raw_read_qc_report",
            Self::ReadQcReport => "read_qc_report",
            Self::Contigs => "contigs",
            Self::FilteredContigs => "filtered_contigs",
            Self::AssemblyReport => "assembly_report",
            Self::Annotation => "annotation",
            Self::Coverage => "coverage",
            Self::MultiQcReport => "multiqc_report",
        };
        f.write_str(s)
    }
}

/// A produced file set of a given kind.
///
/// Read-pair artifacts carry the forward file first and the reverse file second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What the files are.
    pub kind: ArtifactKind,
    /// The files, in a kind-specific order.
    pub paths: Vec<PathBuf>,
}

impl Artifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(kind: ArtifactKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    /// Creates a single-file artifact.
    #[must_use]
    pub fn single(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            paths: vec![path.into()],
        }
    }

    /// Creates a read-pair artifact.
    #[must_use]
    pub fn pair(kind: ArtifactKind, forward: impl Into<PathBuf>, reverse: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            paths: vec![forward.into(), reverse.into()],
        }
    }

    /// Returns the first path.
    #[must_use]
    pub fn primary(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    /// Returns the forward/reverse paths of a read-pair artifact.
    #[must_use]
    pub fn as_pair(&self) -> Option<(&Path, &Path)> {
        match self.paths.as_slice() {
            [forward, reverse] => Some((forward.as_path(), reverse.as_path())),
            _ => None,
        }
    }

    /// Returns the first file that is missing or empty, if any.
    #[must_use]
    pub fn first_defect(&self) -> Option<(&Path, FileCheck)> {
        if self.paths.is_empty() {
            return None;
        }
        self.paths.iter().find_map(|p| match check_file(p) {
            FileCheck::Present(_) => None,
            defect => Some((p.as_path(), defect)),
        })
    }

    /// Returns true if the artifact has files and all of them exist and are non-empty.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        !self.paths.is_empty() && self.first_defect().is_none()
    }
}

/// Result of checking one declared output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCheck {
    /// The file exists with the given size in bytes (always > 0).
    Present(u64),
    /// The path does not exist or is not a regular file.
    Missing,
    /// The file exists but has zero size.
    Empty,
}

/// Checks that a path is a regular, non-empty file.
#[must_use]
pub fn check_file(path: &Path) -> FileCheck {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_file() => FileCheck::Missing,
        Ok(meta) if meta.len() == 0 => FileCheck::Empty,
        Ok(meta) => FileCheck::Present(meta.len()),
        Err(_) => FileCheck::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_kind_display() {
        assert_eq!(ArtifactKind::RawReads.to_string(), "raw_reads");
        assert_eq!(ArtifactKind::FilteredContigs.to_string(), "filtered_contigs");
    }

    #[test]
    fn test_artifact_pair_accessors() {
        let artifact = Artifact::pair(ArtifactKind::TrimmedReads, "a_R1.fq", "a_R2.fq");
        let (fwd, rev) = artifact.as_pair().unwrap();
        assert_eq!(fwd, Path::new("a_R1.fq"));
        assert_eq!(rev, Path::new("a_R2.fq"));
        assert_eq!(artifact.primary(), Some(Path::new("a_R1.fq")));

        let single = Artifact::single(ArtifactKind::Contigs, "contigs.fasta");
        assert!(single.as_pair().is_none());
    }

    #[test]
    fn test_check_file_states() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("full.fasta");
        let empty = dir.path().join("empty.fasta");
        std::fs::write(&full, b">c1\nACGT\n").unwrap();
        std::fs::write(&empty, b"").unwrap();

        assert_eq!(check_file(&full), FileCheck::Present(9));
        assert_eq!(check_file(&empty), FileCheck::Empty);
        assert_eq!(check_file(&dir.path().join("absent")), FileCheck::Missing);
        assert_eq!(check_file(dir.path()), FileCheck::Missing);
    }

    #[test]
    fn test_artifact_intact() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("full.fasta");
        let empty = dir.path().join("empty.fasta");
        std::fs::write(&full, b">c1\nACGT\n").unwrap();
        std::fs::write(&empty, b"").unwrap();

        assert!(Artifact::single(ArtifactKind::Contigs, &full).is_intact());

        let broken = Artifact::pair(ArtifactKind::TrimmedReads, &full, &empty);
        assert!(!broken.is_intact());
        let (path, check) = broken.first_defect().unwrap();
        assert_eq!(path, empty.as_path());
        assert_eq!(check, FileCheck::Empty);

        assert!(!Artifact::new(ArtifactKind::Contigs, Vec::new()).is_intact());
    }
}
