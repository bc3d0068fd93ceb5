//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Executable locations of the external tools.
///
/// A bare name is looked up on `PATH`; anything with a path separator is used as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Trimmomatic launcher or jar.
    #[serde(default = "default_trimmomatic")]
    pub trimmomatic: PathBuf,
    /// BBDuk script.
    #[serde(default = "default_bbduk")]
    pub bbduk: PathBuf,
    /// FastQC executable.
    #[serde(default = "default_fastqc")]
    pub fastqc: PathBuf,
    /// SPAdes executable.
    #[serde(default = "default_spades")]
    pub spades: PathBuf,
    /// BBTools reformat script.
    #[serde(default = "default_reformat")]
    pub reformat: PathBuf,
    /// QUAST executable.
    #[serde(default = "default_quast")]
    pub quast: PathBuf,
    /// Prokka executable.
    #[serde(default = "default_prokka")]
    pub prokka: PathBuf,
    /// BBMap script.
    #[serde(default = "default_bbmap")]
    pub bbmap: PathBuf,
    /// MultiQC executable, run once over the whole output tree.
    #[serde(default = "default_multiqc")]
    pub multiqc: PathBuf,
    /// Java runtime, used when the trimmer is given as a `.jar`.
    #[serde(default = "default_java")]
    pub java: PathBuf,
}

fn default_trimmomatic() -> PathBuf {
    PathBuf::from("trimmomatic")
}

fn default_bbduk() -> PathBuf {
    PathBuf::from("bbduk.sh")
}

fn default_fastqc() -> PathBuf {
    PathBuf::from("fastqc")
}

fn default_spades() -> PathBuf {
    PathBuf::from("spades.py")
}

fn default_reformat() -> PathBuf {
    PathBuf::from("reformat.sh")
}

fn default_quast() -> PathBuf {
    PathBuf::from("quast")
}

fn default_prokka() -> PathBuf {
    PathBuf::from("prokka")
}

fn default_bbmap() -> PathBuf {
    PathBuf::from("bbmap.sh")
}

fn default_multiqc() -> PathBuf {
    PathBuf::from("multiqc")
}

fn default_java() -> PathBuf {
    PathBuf::from("java")
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            trimmomatic: default_trimmomatic(),
            bbduk: default_bbduk(),
            fastqc: default_fastqc(),
            spades: default_spades(),
            reformat: default_reformat(),
            quast: default_quast(),
            prokka: default_prokka(),
            bbmap: default_bbmap(),
            multiqc: default_multiqc(),
            java: default_java(),
        }
    }
}

/// Reference resources consumed by the tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct References {
    /// Adapter sequences FASTA for trimming.
    #[serde(default)]
    pub adapters: Option<PathBuf>,
    /// Trusted protein database for annotation.
    #[serde(default)]
    pub annotation_db: Option<PathBuf>,
}

/// Which trimmer backs the quality-control stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimmerKind {
    /// Trimmomatic in paired-end mode.
    #[default]
    Trimmomatic,
    /// BBDuk.
    Bbduk,
}

/// Read trimming parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmingConfig {
    /// The trimmer to use.
    #[serde(default)]
    pub trimmer: TrimmerKind,
    /// `ILLUMINACLIP` settings after the adapter path.
    #[serde(default = "default_illuminaclip")]
    pub illuminaclip: String,
    /// `SLIDINGWINDOW` settings.
    #[serde(default = "default_sliding_window")]
    pub sliding_window: String,
    /// `LEADING` quality.
    #[serde(default = "default_edge_quality")]
    pub leading: u32,
    /// `TRAILING` quality.
    #[serde(default = "default_edge_quality")]
    pub trailing: u32,
    /// `CROP` length.
    #[serde(default)]
    pub crop: Option<u32>,
    /// `HEADCROP` length.
    #[serde(default)]
    pub headcrop: Option<u32>,
    /// Minimum read length kept after trimming (both trimmers).
    #[serde(default = "default_min_len")]
    pub min_len: u32,
    /// BBDuk-specific options.
    #[serde(default)]
    pub bbduk: BbdukOptions,
}

fn default_illuminaclip() -> String {
    "2:30:10".to_string()
}

fn default_sliding_window() -> String {
    "4:15".to_string()
}

fn default_edge_quality() -> u32 {
    3
}

fn default_min_len() -> u32 {
    36
}

impl Default for TrimmingConfig {
    fn default() -> Self {
        Self {
            trimmer: TrimmerKind::default(),
            illuminaclip: default_illuminaclip(),
            sliding_window: default_sliding_window(),
            leading: default_edge_quality(),
            trailing: default_edge_quality(),
            crop: None,
            headcrop: None,
            min_len: default_min_len(),
            bbduk: BbdukOptions::default(),
        }
    }
}

/// BBDuk trimming options, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BbdukOptions {
    /// `ktrim`.
    pub ktrim: String,
    /// `k`.
    pub k: u32,
    /// `mink`.
    pub mink: u32,
    /// `hdist`.
    pub hdist: u32,
    /// `tpe`.
    pub tpe: String,
    /// `tbo`.
    pub tbo: String,
    /// `qtrim`.
    pub qtrim: String,
    /// `trimq`.
    pub trimq: u32,
}

impl Default for BbdukOptions {
    fn default() -> Self {
        Self {
            ktrim: "r".to_string(),
            k: 23,
            mink: 11,
            hdist: 1,
            tpe: "t".to_string(),
            tbo: "t".to_string(),
            qtrim: "rl".to_string(),
            trimq: 10,
        }
    }
}

/// Assembly post-processing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Contigs shorter than this are dropped before evaluation and annotation.
    #[serde(default = "default_min_contig_length")]
    pub min_contig_length: u32,
}

fn default_min_contig_length() -> u32 {
    1000
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_contig_length: default_min_contig_length(),
        }
    }
}

/// Compute resources handed to each tool and to the sample pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Threads given to each tool invocation.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Memory limit in GB for tools that take one.
    #[serde(default = "default_memory_gb")]
    pub memory_gb: u32,
    /// Upper bound on samples processed at once.
    #[serde(default)]
    pub max_parallel_samples: Option<usize>,
    /// Total CPUs available to the run; defaults to the machine's parallelism.
    #[serde(default)]
    pub cpu_budget: Option<usize>,
}

fn default_threads() -> usize {
    4
}

fn default_memory_gb() -> u32 {
    16
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            memory_gb: default_memory_gb(),
            max_parallel_samples: None,
            cpu_budget: None,
        }
    }
}

/// Per-tool timeouts in seconds. `None` waits indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Read trimming.
    pub trimming_secs: Option<u64>,
    /// Read quality report.
    pub read_qc_secs: Option<u64>,
    /// Assembly.
    pub assembly_secs: Option<u64>,
    /// Contig length filtering.
    pub contig_filter_secs: Option<u64>,
    /// Assembly evaluation.
    pub evaluation_secs: Option<u64>,
    /// Annotation.
    pub annotation_secs: Option<u64>,
    /// Coverage mapping.
    pub coverage_secs: Option<u64>,
    /// Run-level MultiQC report.
    pub multiqc_secs: Option<u64>,
    /// Whole run.
    pub run_secs: Option<u64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            trimming_secs: Some(2 * 3600),
            read_qc_secs: Some(3600),
            assembly_secs: None,
            contig_filter_secs: Some(1800),
            evaluation_secs: Some(3600),
            annotation_secs: None,
            coverage_secs: None,
            multiqc_secs: Some(3600),
            run_secs: None,
        }
    }
}

/// Converts an optional number of seconds into a duration.
#[must_use]
pub fn secs(value: Option<u64>) -> Option<Duration> {
    value.map(Duration::from_secs)
}

/// Which stages take part in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    /// Quality report over the untrimmed reads.
    pub raw_read_qc: bool,
    /// Trimming plus read quality report.
    pub quality_control: bool,
    /// De novo assembly.
    pub assembly: bool,
    /// Minimum contig length filter.
    pub contig_filter: bool,
    /// Assembly evaluation.
    pub evaluation: bool,
    /// Genome annotation.
    pub annotation: bool,
    /// Read coverage against the filtered contigs.
    pub coverage: bool,
    /// MultiQC report over every sample once all samples finish.
    pub multiqc: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            raw_read_qc: true,
            quality_control: true,
            assembly: true,
            contig_filter: true,
            evaluation: true,
            annotation: true,
            coverage: false,
            multiqc: true,
        }
    }
}
