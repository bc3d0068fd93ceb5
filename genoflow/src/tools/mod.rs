//! External tool invocation.
//!
//! This module provides:
//! - The [`ToolAdapter`] capability and its [`ToolContext`]
//! - [`ToolCommand`]/[`CommandTool`] for tools run as one external command
//! - Process execution with timeouts, abort and output verification
//! - Concrete adapters for the supported tools

mod adapter;
pub mod adapters;
mod outcome;
pub mod process;

pub use adapter::{CommandTool, ToolAdapter, ToolCommand, ToolContext};
pub use outcome::{tail_lines, ToolFailure, ToolOutcome};
