//! Run-level cancellation.
//!
//! One [`CancellationToken`] is shared by every sample of a run. Cancelling it
//! (operator interrupt or run timeout) kills running tool processes and makes
//! every stage that has not started record the abort reason.

mod token;

pub use token::CancellationToken;
