//! Command-line front end for genoflow.
//!
//! Parses arguments, initialises logging, wires operator interrupts and the
//! run timeout to the run's cancellation token, and maps outcomes to exit
//! codes: 0 when every sample completed, 1 when any did not, 2 for
//! configuration and dependency errors.

pub mod cli;
pub mod commands;
pub mod logging;
