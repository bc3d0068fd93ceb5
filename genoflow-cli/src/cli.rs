//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use genoflow::config::{PipelineConfig, TrimmerKind};
use genoflow::errors::ConfigError;
use std::path::PathBuf;

/// Genoflow - paired-read genome assembly pipeline
#[derive(Parser, Debug)]
#[command(
    name = "genoflow",
    author,
    version,
    propagate_version = true,
    about = "Paired-read genome assembly pipeline orchestrator",
    long_about = "Discovers paired read files in a directory and runs every sample through \n\
                  quality control, assembly, contig filtering, evaluation and annotation \n\
                  using external tools, writing one output tree per sample and a run summary."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "GENOFLOW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline over an input directory
    Run(RunArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory holding the paired read files
    #[arg(short, long, required_unless_present = "check")]
    pub input: Option<PathBuf>,

    /// Directory receiving one subdirectory per sample and the run summary
    #[arg(short, long, required_unless_present = "check")]
    pub output: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "GENOFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only check that the external tools are installed, then exit
    #[arg(long)]
    pub check: bool,

    /// Trimmer executable (or Trimmomatic jar)
    #[arg(long)]
    pub trimmer_path: Option<PathBuf>,

    /// Read quality report executable
    #[arg(long)]
    pub qc_path: Option<PathBuf>,

    /// Assembler executable
    #[arg(long)]
    pub assembler_path: Option<PathBuf>,

    /// Assembly evaluator executable
    #[arg(long)]
    pub evaluator_path: Option<PathBuf>,

    /// Annotator executable
    #[arg(long)]
    pub annotator_path: Option<PathBuf>,

    /// MultiQC executable for the run-level report
    #[arg(long)]
    pub multiqc_path: Option<PathBuf>,

    /// Adapter sequences FASTA used for trimming
    #[arg(long)]
    pub adapters_path: Option<PathBuf>,

    /// Protein database passed to the annotator
    #[arg(long)]
    pub annotator_db_path: Option<PathBuf>,

    /// Drop contigs shorter than this many bases
    #[arg(long)]
    pub min_contig_length: Option<u32>,

    /// Threads given to each tool
    #[arg(long)]
    pub threads: Option<usize>,

    /// Memory limit in GB given to the assembler
    #[arg(long)]
    pub memory_gb: Option<u32>,

    /// Maximum number of samples processed at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Abort the whole run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RunArgs {
    /// Resolves the run configuration: built-in defaults, then the config
    /// file, then command-line flags.
    ///
    /// The result is not validated yet.
    pub fn resolve_config(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(path) = &self.trimmer_path {
            match config.trimming.trimmer {
                TrimmerKind::Trimmomatic => config.tools.trimmomatic.clone_from(path),
                TrimmerKind::Bbduk => config.tools.bbduk.clone_from(path),
            }
        }
        if let Some(path) = &self.qc_path {
            config.tools.fastqc.clone_from(path);
        }
        if let Some(path) = &self.assembler_path {
            config.tools.spades.clone_from(path);
        }
        if let Some(path) = &self.evaluator_path {
            config.tools.quast.clone_from(path);
        }
        if let Some(path) = &self.annotator_path {
            config.tools.prokka.clone_from(path);
        }
        if let Some(path) = &self.multiqc_path {
            config.tools.multiqc.clone_from(path);
        }
        if let Some(path) = &self.adapters_path {
            config.references.adapters = Some(path.clone());
        }
        if let Some(path) = &self.annotator_db_path {
            config.references.annotation_db = Some(path.clone());
        }
        if let Some(length) = self.min_contig_length {
            config.assembly.min_contig_length = length;
        }
        if let Some(threads) = self.threads {
            config.resources.threads = threads;
        }
        if let Some(memory) = self.memory_gb {
            config.resources.memory_gb = memory;
        }
        if let Some(jobs) = self.jobs {
            config.resources.max_parallel_samples = Some(jobs);
        }
        if let Some(timeout) = self.timeout {
            config.timeouts.run_secs = Some(timeout);
        }
        Ok(config)
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
