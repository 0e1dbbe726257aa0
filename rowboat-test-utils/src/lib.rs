//! Test utilities for rowboat: input corpus generators and instrumented
//! progress sinks.

pub mod corpus;
pub mod sinks;

pub use corpus::{mixed_csv, numeric_csv, ragged_csv, variable_width_csv};
pub use sinks::{CancellingProgress, RecordingProgress};
