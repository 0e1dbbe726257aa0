//! Instrumented progress sinks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rowboat_io::{ProgressSink, ReadStatus};

/// Sink that records every event it receives.
#[derive(Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<f64>>,
    finished: Mutex<Option<(f64, ReadStatus)>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fractions received through `report`, in arrival order.
    pub fn reports(&self) -> Vec<f64> {
        self.reports.lock().unwrap().clone()
    }

    /// The terminal event, if one arrived.
    pub fn finished(&self) -> Option<(f64, ReadStatus)> {
        *self.finished.lock().unwrap()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, fraction: f64) -> bool {
        self.reports.lock().unwrap().push(fraction);
        true
    }

    fn finish(&self, fraction: f64, status: ReadStatus) {
        *self.finished.lock().unwrap() = Some((fraction, status));
    }
}

/// Sink that requests cancellation after a number of reports.
pub struct CancellingProgress {
    allow: usize,
    seen: AtomicUsize,
    finished: Mutex<Option<ReadStatus>>,
}

impl CancellingProgress {
    /// Allow `allow` reports before answering with a cancellation request.
    pub fn after(allow: usize) -> Self {
        Self {
            allow,
            seen: AtomicUsize::new(0),
            finished: Mutex::new(None),
        }
    }

    /// The terminal status, if the read finished.
    pub fn finished(&self) -> Option<ReadStatus> {
        *self.finished.lock().unwrap()
    }
}

impl ProgressSink for CancellingProgress {
    fn report(&self, _fraction: f64) -> bool {
        self.seen.fetch_add(1, Ordering::Relaxed) < self.allow
    }

    fn finish(&self, _fraction: f64, status: ReadStatus) {
        *self.finished.lock().unwrap() = Some(status);
    }
}
