//! Stage definitions and the default topology.

use crate::config::{PipelineConfig, TrimmerKind};
use crate::core::ArtifactKind;
use crate::errors::ConfigError;
use crate::tools::adapters::{BbDuk, BbMap, FastQc, Prokka, Quast, Reformat, Spades, Trimmomatic};
use crate::tools::ToolAdapter;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Names of the stages in the default topology.
pub mod names {
    /// Quality report over the untrimmed reads.
    pub const RAW_READ_QC: &str = "raw_read_qc";
    /// Read trimming plus read quality report.
    pub const QUALITY_CONTROL: &str = "quality_control";
    /// De novo assembly.
    pub const ASSEMBLY: &str = "assembly";
    /// Minimum contig length filter.
    pub const CONTIG_FILTER: &str = "contig_filter";
    /// Assembly evaluation.
    pub const EVALUATION: &str = "evaluation";
    /// Genome annotation.
    pub const ANNOTATION: &str = "annotation";
    /// Read coverage against the filtered contigs.
    pub const COVERAGE: &str = "coverage";
}

/// One named step of the pipeline.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    /// Stage name, also the stage's directory name.
    pub name: String,
    /// Artifact kinds that must exist and be non-empty before the stage runs.
    pub required_inputs: Vec<ArtifactKind>,
    /// Artifact kinds the stage must produce to succeed.
    pub outputs: Vec<ArtifactKind>,
    /// Adapters invoked in order; each runs only if the previous one succeeded.
    pub adapters: Vec<Arc<dyn ToolAdapter>>,
    /// Whether a failure of this stage fails the sample.
    pub required: bool,
}

impl StageDefinition {
    /// Creates a required stage with no inputs, outputs or adapters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_inputs: Vec::new(),
            outputs: Vec::new(),
            adapters: Vec::new(),
            required: true,
        }
    }

    /// Adds a required input kind.
    #[must_use]
    pub fn with_input(mut self, kind: ArtifactKind) -> Self {
        self.required_inputs.push(kind);
        self
    }

    /// Adds an output kind.
    #[must_use]
    pub fn with_output(mut self, kind: ArtifactKind) -> Self {
        self.outputs.push(kind);
        self
    }

    /// Appends an adapter.
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl ToolAdapter + 'static) -> Self {
        self.adapters.push(Arc::new(adapter));
        self
    }

    /// Appends a shared adapter.
    #[must_use]
    pub fn with_shared_adapter(mut self, adapter: Arc<dyn ToolAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Marks the stage as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Returns the adapter names in invocation order.
    #[must_use]
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Validates the stage on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be a directory name or the stage
    /// has no adapters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let safe = !self.name.is_empty()
            && self.name != "."
            && self.name != ".."
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !safe {
            return Err(ConfigError::invalid(
                "stages",
                format!("stage name '{}' is not a valid directory name", self.name),
            ));
        }
        if self.adapters.is_empty() {
            return Err(ConfigError::invalid(
                "stages",
                format!("stage '{}' has no tools", self.name),
            ));
        }
        Ok(())
    }
}

/// Validates an ordered topology.
///
/// Stage names must be unique, and every required input must be the raw reads
/// or an output of an earlier stage.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_topology(stages: &[StageDefinition]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    let mut available = BTreeSet::from([ArtifactKind::RawReads]);
    for stage in stages {
        stage.validate()?;
        if !seen.insert(stage.name.as_str()) {
            return Err(ConfigError::invalid(
                "stages",
                format!("duplicate stage '{}'", stage.name),
            ));
        }
        if let Some(kind) = stage.required_inputs.iter().find(|k| !available.contains(*k)) {
            return Err(ConfigError::invalid(
                "stages",
                format!("stage '{}' needs {kind}, which no earlier stage produces", stage.name),
            ));
        }
        available.extend(stage.outputs.iter().copied());
    }
    Ok(())
}

/// Builds the standard stage sequence, leaving out disabled stages.
///
/// When quality control is disabled, assembly and coverage read the raw reads.
#[must_use]
pub fn default_topology(config: &PipelineConfig) -> Vec<StageDefinition> {
    let toggles = &config.stages;
    let reads = if toggles.quality_control {
        ArtifactKind::TrimmedReads
    } else {
        ArtifactKind::RawReads
    };
    let mut stages = Vec::new();

    if toggles.raw_read_qc {
        stages.push(
            StageDefinition::new(names::RAW_READ_QC)
                .with_input(ArtifactKind::RawReads)
                .with_output(ArtifactKind::RawReadQcReport)
                .with_adapter(FastQc::new(ArtifactKind::RawReads))
                .optional(),
        );
    }
    if toggles.quality_control {
        let trimmer: Arc<dyn ToolAdapter> = match config.trimming.trimmer {
            TrimmerKind::Trimmomatic => Arc::new(Trimmomatic),
            TrimmerKind::Bbduk => Arc::new(BbDuk),
        };
        stages.push(
            StageDefinition::new(names::QUALITY_CONTROL)
                .with_input(ArtifactKind::RawReads)
                .with_output(ArtifactKind::TrimmedReads)
                .with_output(ArtifactKind::ReadQcReport)
                .with_shared_adapter(trimmer)
                .with_adapter(FastQc::default()),
        );
    }
    if toggles.assembly {
        stages.push(
            StageDefinition::new(names::ASSEMBLY)
                .with_input(reads)
                .with_output(ArtifactKind::Contigs)
                .with_adapter(Spades::new(reads)),
        );
    }
    if toggles.contig_filter {
        stages.push(
            StageDefinition::new(names::CONTIG_FILTER)
                .with_input(ArtifactKind::Contigs)
                .with_output(ArtifactKind::FilteredContigs)
                .with_adapter(Reformat),
        );
    }
    if toggles.evaluation {
        stages.push(
            StageDefinition::new(names::EVALUATION)
                .with_input(ArtifactKind::FilteredContigs)
                .with_output(ArtifactKind::AssemblyReport)
                .with_adapter(Quast)
                .optional(),
        );
    }
    if toggles.annotation {
        stages.push(
            StageDefinition::new(names::ANNOTATION)
                .with_input(ArtifactKind::FilteredContigs)
                .with_output(ArtifactKind::Annotation)
                .with_adapter(Prokka),
        );
    }
    if toggles.coverage {
        stages.push(
            StageDefinition::new(names::COVERAGE)
                .with_input(reads)
                .with_input(ArtifactKind::FilteredContigs)
                .with_output(ArtifactKind::Coverage)
                .with_adapter(BbMap::new(reads))
                .optional(),
        );
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stage_names(stages: &[StageDefinition]) -> Vec<&str> {
        stages.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_default_topology_order_and_flags() {
        let stages = default_topology(&PipelineConfig::default());

        assert_eq!(
            stage_names(&stages),
            vec!["raw_read_qc", "quality_control", "assembly", "contig_filter", "evaluation", "annotation"]
        );
        assert_eq!(stages[0].adapter_names(), vec!["fastqc"]);
        assert_eq!(stages[0].outputs, vec![ArtifactKind::RawReadQcReport]);
        assert!(!stages[0].required);
        assert_eq!(stages[1].adapter_names(), vec!["trimmomatic", "fastqc"]);
        assert!(stages[1].required);
        assert!(!stages[4].required);
        assert!(validate_topology(&stages).is_ok());
    }

    #[test]
    fn test_default_topology_with_bbduk_and_coverage() {
        let mut config = PipelineConfig::default();
        config.trimming.trimmer = TrimmerKind::Bbduk;
        config.stages.coverage = true;
        let stages = default_topology(&config);

        assert_eq!(stages[1].adapter_names(), vec!["bbduk", "fastqc"]);
        let coverage = stages.last().unwrap();
        assert_eq!(coverage.name, "coverage");
        assert!(!coverage.required);
        assert!(validate_topology(&stages).is_ok());
    }

    #[test]
    fn test_default_topology_without_quality_control() {
        let mut config = PipelineConfig::default();
        config.stages.raw_read_qc = false;
        config.stages.quality_control = false;
        config.stages.evaluation = false;
        let stages = default_topology(&config);

        assert_eq!(stage_names(&stages), vec!["assembly", "contig_filter", "annotation"]);
        assert_eq!(stages[0].required_inputs, vec![ArtifactKind::RawReads]);
        assert!(validate_topology(&stages).is_ok());
    }

    #[test]
    fn test_validate_topology_rejects_unproduced_input() {
        let stages = vec![StageDefinition::new("annotation")
            .with_input(ArtifactKind::FilteredContigs)
            .with_adapter(Prokka)];
        let err = validate_topology(&stages).unwrap_err();
        assert!(err.to_string().contains("filtered_contigs"));
    }

    #[test]
    fn test_validate_topology_rejects_duplicates_and_bad_names() {
        let stage = StageDefinition::new("assembly").with_adapter(Spades::default());
        assert!(validate_topology(&[stage.clone(), stage]).is_err());

        let bad = StageDefinition::new("../escape").with_adapter(Reformat);
        assert!(bad.validate().is_err());

        let empty = StageDefinition::new("empty");
        assert!(empty.validate().is_err());
    }
}
