//! Progress reporting
//!
//! Progress flows through a caller-supplied sink. Only one worker (the
//! master) ever calls the sink: the original host runtime for this reporting
//! path was not thread-safe, and funneling every report through a single
//! thread keeps the reasoning simple even when the sink itself would
//! tolerate more.

/// Terminal status delivered with the final progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The read ran to completion.
    Complete = 1,
    /// The read stopped on an error.
    Error = 2,
    /// The read was cancelled through the sink.
    Interrupted = 3,
}

/// Receiver for progress events during a read.
pub trait ProgressSink: Sync {
    /// Called with the fraction of input bytes committed, in `[0, 1]`.
    /// Returning `false` requests cooperative cancellation; the read stops
    /// with [`rowboat_core::ReadError::Interrupted`].
    fn report(&self, fraction: f64) -> bool;

    /// Called exactly once when the parallel region ends.
    fn finish(&self, _fraction: f64, _status: ReadStatus) {}
}
