//! # Genoflow
//!
//! Orchestrates paired-read genome assembly across a directory of samples.
//!
//! Genoflow drives external bioinformatics tools through a fixed, ordered
//! sequence of stages for every sample it discovers:
//!
//! - **Discovery**: pair forward/reverse read files by naming convention
//! - **Stages**: quality control, assembly, contig filtering, evaluation,
//!   annotation and optional coverage, each backed by one or more tool adapters
//! - **Short-circuiting**: a failed required stage skips the rest of its sample
//!   and never affects other samples
//! - **Resume**: completed stages are recorded with a fingerprint and reused
//!   on the next run
//! - **Run summary**: a per-sample, per-stage ledger written as JSON
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genoflow::prelude::*;
//!
//! let config = PipelineConfig::load(Path::new("genoflow.toml"))?;
//! let summary = Orchestrator::new(config)
//!     .run(Path::new("reads"), Path::new("results"))
//!     .await?;
//! std::process::exit(summary.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod tools;

/// Version of this crate, recorded in completion markers and run summaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Artifact, ArtifactKind, Sample, SampleStatus, StageStatus};
    pub use crate::discovery::{FilePairMatcher, ReadConvention};
    pub use crate::errors::{ConfigError, DiscoveryWarning, GenoflowError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::orchestrator::{DependencyReport, Orchestrator, RunSummary};
    pub use crate::pipeline::{SamplePipeline, SampleReport};
    pub use crate::stages::{default_topology, StageDefinition, StageResult, StageRunner};
    pub use crate::tools::{CommandTool, ToolAdapter, ToolCommand, ToolContext, ToolOutcome};
}
