//! Per-sample pipeline execution.
//!
//! This module provides:
//! - The stage sequence for one sample, with required-stage short-circuiting
//! - Sample reports derived from the stage ledger

mod report;
mod sample;


pub use report::SampleReport;
pub use sample::SamplePipeline;
