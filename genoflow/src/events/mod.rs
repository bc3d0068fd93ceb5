//! Pipeline lifecycle events.
//!
//! Stage and tool transitions are reported to an [`EventSink`] in addition to
//! the tracing logs, so embedders and tests can observe a run without parsing
//! log output.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by the pipeline.
pub mod types {
    /// A stage began for a sample.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage succeeded.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage was satisfied from a previous run.
    pub const STAGE_REUSED: &str = "stage.reused";
    /// A stage was skipped.
    pub const STAGE_SKIPPED: &str = "stage.skipped";
    /// A stage failed.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A tool invocation began.
    pub const TOOL_STARTED: &str = "tool.started";
    /// A tool invocation ended, successfully or not.
    pub const TOOL_COMPLETED: &str = "tool.completed";
    /// A sample pipeline finished.
    pub const SAMPLE_COMPLETED: &str = "sample.completed";
}
