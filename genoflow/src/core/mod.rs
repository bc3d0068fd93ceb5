//! Core domain model types for genoflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage and sample status enums
//! - Artifacts and artifact kinds
//! - The per-sample unit of work

mod artifact;
mod sample;
mod status;

pub use artifact::{check_file, Artifact, ArtifactKind, FileCheck};
pub use sample::Sample;
pub use status::{SampleStatus, StageStatus};
