//! Test fixtures: input read files and configurations.

use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;

/// Four-line FASTQ record used for fixture read files.
pub const FASTQ_RECORD: &[u8] = b"@read1\nACGTACGTAC\n+\nIIIIIIIIII\n";

/// Writes `<sample>_R1.fastq` and `<sample>_R2.fastq` into `dir`.
///
/// # Panics
///
/// Panics if the files cannot be written.
#[allow(clippy::expect_used)]
pub fn write_fastq_pair(dir: &Path, sample: &str) -> (PathBuf, PathBuf) {
    let forward = dir.join(format!("{sample}_R1.fastq"));
    let reverse = dir.join(format!("{sample}_R2.fastq"));
    std::fs::write(&forward, FASTQ_RECORD).expect("write forward reads");
    std::fs::write(&reverse, FASTQ_RECORD).expect("write reverse reads");
    (forward, reverse)
}

/// Returns a configuration that passes validation, with an adapters file
/// written into `dir`. The run-level MultiQC report is switched off.
///
/// # Panics
///
/// Panics if the adapters file cannot be written.
#[allow(clippy::expect_used)]
pub fn test_config(dir: &Path) -> PipelineConfig {
    let adapters = dir.join("adapters.fa");
    std::fs::write(&adapters, b">PrefixPE/1\nTACACTCTTTCCCTACACGACGCTCTTCCGATCT\n")
        .expect("write adapters file");
    let mut config = PipelineConfig::default();
    config.references.adapters = Some(adapters);
    config.resources.threads = 1;
    config.resources.memory_gb = 1;
    config.stages.multiqc = false;
    config
}
