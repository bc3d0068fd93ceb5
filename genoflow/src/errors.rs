//! Error types for genoflow.
//!
//! Only run-fatal conditions are errors. Everything that can go wrong for a
//! single sample (a missing prerequisite, a tool crash, an empty contig file)
//! is recorded as data in the sample's stage ledger instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for genoflow operations.
#[derive(Debug, Error)]
pub enum GenoflowError {
    /// The run could not be configured. Raised before any sample is processed.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The run was aborted by an operator interrupt or the run timeout.
    #[error("Run aborted: {0}")]
    RunAborted(String),

    /// A filesystem operation owned by the orchestrator failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GenoflowError {
    /// Wraps an IO error with the path that caused it.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error belongs to the configuration class.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<serde_json::Error> for GenoflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised while loading or validating a [`PipelineConfig`](crate::config::PipelineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        /// The configuration file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A field holds an invalid value.
    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid {
        /// Dotted field name, e.g. `resources.threads`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The input directory is missing or unreadable.
    #[error("Input directory {} is not readable: {message}", path.display())]
    InputDirectory {
        /// The input directory.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// One or more required external tools failed the dependency check.
    #[error("Missing required tools: {}", tools.join(", "))]
    MissingTools {
        /// Names of the tools that failed.
        tools: Vec<String>,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an input-directory error.
    #[must_use]
    pub fn input_directory(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InputDirectory {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A non-fatal problem found while pairing read files.
///
/// Every file recognised as a read file but not placed into a sample ends up
/// in exactly one warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoveryWarning {
    /// Only one mate of the pair was found.
    Orphan {
        /// Sample name derived from the file.
        sample: String,
        /// The lone file.
        files: Vec<PathBuf>,
    },
    /// More than one file claims the same mate of a sample.
    Ambiguous {
        /// Sample name shared by the files.
        sample: String,
        /// All files of the group.
        files: Vec<PathBuf>,
    },
    /// A read file whose name carries no forward/reverse marker.
    UnrecognizedMate {
        /// The file.
        files: Vec<PathBuf>,
    },
    /// The derived sample name cannot be used as a directory name.
    InvalidSampleName {
        /// The offending name.
        sample: String,
        /// All files of the group.
        files: Vec<PathBuf>,
    },
}

impl DiscoveryWarning {
    /// Returns the files covered by this warning.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        match self {
            Self::Orphan { files, .. }
            | Self::Ambiguous { files, .. }
            | Self::UnrecognizedMate { files }
            | Self::InvalidSampleName { files, .. } => files,
        }
    }
}

impl std::fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .files()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self {
            Self::Orphan { sample, .. } => {
                write!(f, "sample '{sample}' has only one mate: {names}")
            }
            Self::Ambiguous { sample, .. } => {
                write!(f, "sample '{sample}' has ambiguous mates: {names}")
            }
            Self::UnrecognizedMate { .. } => {
                write!(f, "no forward/reverse marker in: {names}")
            }
            Self::InvalidSampleName { sample, .. } => {
                write!(f, "sample name '{sample}' is not a valid directory name: {names}")
            }
        }
    }
}
