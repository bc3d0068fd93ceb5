//! Stages: named steps of the per-sample pipeline.
//!
//! A [`StageDefinition`] declares which artifacts a stage needs and produces
//! and which tools it runs. The [`StageRunner`] applies one definition to one
//! sample and always returns a [`StageResult`].

mod definition;
mod marker;
mod result;
mod runner;

pub use definition::{default_topology, names, validate_topology, StageDefinition};
pub use marker::{fingerprint, hash_parameters, CompletionMarker, MARKER_FILE};
pub use result::{
    aborted_reason, StageResult, MISSING_PREREQUISITE, RUN_ABORTED, UPSTREAM_REQUIRED_FAILED,
};
pub use runner::StageRunner;
