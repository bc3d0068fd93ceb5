//! Testing utilities for genoflow pipelines.
//!
//! This module provides:
//! - A scripted tool adapter that writes files instead of running processes
//! - Read-file and configuration fixtures

mod fixtures;
mod mocks;

pub use fixtures::{test_config, write_fastq_pair, FASTQ_RECORD};
pub use mocks::ScriptedTool;
