//! Run configuration.
//!
//! A [`PipelineConfig`] is resolved once per run from built-in defaults, an
//! optional TOML file, and command-line overrides, validated, and then shared
//! read-only by every sample through an `Arc`.

mod sections;

pub use sections::{
    secs, AssemblyConfig, BbdukOptions, References, Resources, StageToggles, Timeouts, ToolPaths,
    TrimmerKind, TrimmingConfig,
};

use crate::discovery::ReadConvention;
use crate::errors::ConfigError;
use crate::tools::adapters::is_jar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Immutable per-run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// External tool executables.
    #[serde(default)]
    pub tools: ToolPaths,
    /// Reference resources.
    #[serde(default)]
    pub references: References,
    /// Read trimming parameters.
    #[serde(default)]
    pub trimming: TrimmingConfig,
    /// Assembly post-processing parameters.
    #[serde(default)]
    pub assembly: AssemblyConfig,
    /// Compute resources.
    #[serde(default)]
    pub resources: Resources,
    /// Tool and run timeouts.
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Stage enable flags.
    #[serde(default)]
    pub stages: StageToggles,
    /// Read file naming convention.
    #[serde(default)]
    pub discovery: ReadConvention,
    /// Number of stderr lines kept in failure reasons.
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,
}

fn default_stderr_tail_lines() -> usize {
    20
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            references: References::default(),
            trimming: TrimmingConfig::default(),
            assembly: AssemblyConfig::default(),
            resources: Resources::default(),
            timeouts: Timeouts::default(),
            stages: StageToggles::default(),
            discovery: ReadConvention::default(),
            stderr_tail_lines: default_stderr_tail_lines(),
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration from TOML text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid for the schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks the configuration for values no run could succeed with.
    ///
    /// Tool executables are not checked here; that is the dependency
    /// pre-flight's job.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.threads == 0 {
            return Err(ConfigError::invalid("resources.threads", "must be at least 1"));
        }
        if self.resources.memory_gb == 0 {
            return Err(ConfigError::invalid("resources.memory_gb", "must be at least 1"));
        }
        if self.resources.max_parallel_samples == Some(0) {
            return Err(ConfigError::invalid(
                "resources.max_parallel_samples",
                "must be at least 1",
            ));
        }
        if self.resources.cpu_budget == Some(0) {
            return Err(ConfigError::invalid("resources.cpu_budget", "must be at least 1"));
        }
        if self.assembly.min_contig_length == 0 {
            return Err(ConfigError::invalid(
                "assembly.min_contig_length",
                "must be at least 1",
            ));
        }
        if self.stderr_tail_lines == 0 {
            return Err(ConfigError::invalid("stderr_tail_lines", "must be at least 1"));
        }

        if self.stages.quality_control {
            match &self.references.adapters {
                None => {
                    return Err(ConfigError::invalid(
                        "references.adapters",
                        "an adapter sequence file is required for trimming",
                    ))
                }
                Some(path) => require_file("references.adapters", path)?,
            }
        }
        if self.stages.annotation {
            if let Some(path) = &self.references.annotation_db {
                require_file("references.annotation_db", path)?;
            }
        }

        self.discovery.validate()
    }

    /// Anchors relative paths at `base`.
    ///
    /// Tools run inside their stage directory, so a reference file or a tool
    /// given as a relative path (anything with a directory part, or a jar)
    /// must be made absolute first. Bare tool names stay as they are and are
    /// looked up on `PATH`.
    pub fn anchor_relative_paths(&mut self, base: &Path) {
        let tools = &mut self.tools;
        for program in [
            &mut tools.trimmomatic,
            &mut tools.bbduk,
            &mut tools.fastqc,
            &mut tools.spades,
            &mut tools.reformat,
            &mut tools.quast,
            &mut tools.prokka,
            &mut tools.bbmap,
            &mut tools.multiqc,
            &mut tools.java,
        ] {
            if program.components().count() > 1 || is_jar(program) {
                anchor(base, program);
            }
        }
        for reference in [&mut self.references.adapters, &mut self.references.annotation_db]
            .into_iter()
            .flatten()
        {
            anchor(base, reference);
        }
    }

    /// Returns the number of samples processed at once.
    ///
    /// Uses `resources.max_parallel_samples` when set, otherwise divides the
    /// CPU budget by the per-tool thread count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if let Some(n) = self.resources.max_parallel_samples {
            return n.max(1);
        }
        let budget = self.resources.cpu_budget.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        });
        (budget / self.resources.threads.max(1)).max(1)
    }
}

fn anchor(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn require_file(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("{} does not exist or is not a file", path.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_with_adapters(dir: &Path) -> PipelineConfig {
        let adapters = dir.join("adapters.fa");
        std::fs::write(&adapters, ">a\nAGATCGGAAGAGC\n").unwrap();
        let mut config = PipelineConfig::default();
        config.references.adapters = Some(adapters);
        config
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.assembly.min_contig_length, 1000);
        assert_eq!(config.trimming.illuminaclip, "2:30:10");
        assert_eq!(config.trimming.min_len, 36);
        assert_eq!(config.resources.threads, 4);
        assert!(config.stages.evaluation);
        assert!(!config.stages.coverage);
        assert_eq!(config.timeouts.assembly_secs, None);
    }

    #[test]
    fn test_from_toml_partial() {
        let text = r#"
            stderr_tail_lines = 5

            [tools]
            spades = "/opt/spades/bin/spades.py"

            [assembly]
            min_contig_length = 500

            [trimming]
            trimmer = "bbduk"

            [stages]
            coverage = true
        "#;
        let config = PipelineConfig::from_toml_str(text).unwrap();

        assert_eq!(config.tools.spades, PathBuf::from("/opt/spades/bin/spades.py"));
        assert_eq!(config.tools.prokka, PathBuf::from("prokka"));
        assert_eq!(config.assembly.min_contig_length, 500);
        assert_eq!(config.trimming.trimmer, TrimmerKind::Bbduk);
        assert_eq!(config.trimming.bbduk.k, 23);
        assert!(config.stages.coverage);
        assert!(config.stages.assembly);
        assert_eq!(config.stderr_tail_lines, 5);
    }

    #[test]
    fn test_from_toml_empty_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let err = PipelineConfig::from_toml_str("[resources]\nthreads = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/genoflow.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_requires_adapters_for_trimming() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("references.adapters"));

        let mut config = PipelineConfig::default();
        config.stages.quality_control = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_checks_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_adapters(dir.path());
        assert!(config.validate().is_ok());

        config.resources.threads = 0;
        assert!(config.validate().unwrap_err().to_string().contains("resources.threads"));

        let mut config = config_with_adapters(dir.path());
        config.assembly.min_contig_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_annotation_db_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_adapters(dir.path());
        config.references.annotation_db = Some(dir.path().join("missing.faa"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("references.annotation_db"));
    }

    #[test]
    fn test_anchor_relative_paths() {
        let mut config = PipelineConfig::default();
        config.tools.spades = PathBuf::from("bin/spades.py");
        config.tools.trimmomatic = PathBuf::from("trimmomatic-0.39.jar");
        config.tools.prokka = PathBuf::from("/opt/prokka/bin/prokka");
        config.references.adapters = Some(PathBuf::from("refs/adapters.fa"));

        config.anchor_relative_paths(Path::new("/work"));

        assert_eq!(config.tools.spades, PathBuf::from("/work/bin/spades.py"));
        assert_eq!(config.tools.trimmomatic, PathBuf::from("/work/trimmomatic-0.39.jar"));
        assert_eq!(config.tools.prokka, PathBuf::from("/opt/prokka/bin/prokka"));
        assert_eq!(config.tools.quast, PathBuf::from("quast"));
        assert_eq!(config.references.adapters, Some(PathBuf::from("/work/refs/adapters.fa")));
        assert_eq!(config.references.annotation_db, None);
    }

    #[test]
    fn test_worker_count() {
        let mut config = PipelineConfig::default();
        config.resources.max_parallel_samples = Some(3);
        assert_eq!(config.worker_count(), 3);

        config.resources.max_parallel_samples = None;
        config.resources.cpu_budget = Some(16);
        config.resources.threads = 4;
        assert_eq!(config.worker_count(), 4);

        config.resources.cpu_budget = Some(2);
        assert_eq!(config.worker_count(), 1);
    }
}
