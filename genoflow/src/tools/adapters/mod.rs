//! Adapters for the external bioinformatics tools.
//!
//! Each adapter only knows how to build its tool's command line and which
//! files the tool promises to write. Running and verifying is shared.

mod annotation;
mod assembly;
mod coverage;
mod read_qc;
mod trimming;

pub use annotation::Prokka;
pub use assembly::{Quast, Reformat, Spades};
pub use coverage::BbMap;
pub use read_qc::FastQc;
pub use trimming::{is_jar, BbDuk, Trimmomatic};
