//! Wall-clock and memory measurement for a read
//!
//! A read's summary carries its wall time and, when the platform reports
//! it, the process's peak resident set over the read. The allocations that
//! set that peak are front-loaded: the output is sized from the row
//! estimate before the first chunk parses, and the commit-phase allocator
//! grows it geometrically soon after when the estimate ran short. The
//! sampler therefore polls densely at the start of the read and doubles
//! its interval after every sample, up to a ceiling; long reads pay a few
//! dozen samples total instead of a fixed-rate poll. Reads shorter than
//! the first interval may see no sample and report `None`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{get_current_pid, Pid, ProcessRefreshKind, RefreshKind, System};

/// First sampling interval; doubles after each sample.
const FIRST_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Ceiling on the backed-off sampling interval.
const MAX_SAMPLE_INTERVAL: Duration = Duration::from_millis(640);

/// Runtime statistics for one read.
#[derive(Debug, Clone)]
pub struct ReadRuntimeStats {
    /// Wall-clock duration of the read.
    pub wall_time: Duration,
    /// Peak resident set size observed, in bytes, if sampling succeeded.
    pub peak_rss_bytes: Option<u64>,
}

/// Measures wall-clock duration and optional peak RSS usage.
pub(crate) struct RuntimeMeasurement {
    start: Instant,
    sampler: Option<RssSampler>,
}

impl RuntimeMeasurement {
    /// Begin a new runtime measurement window.
    pub(crate) fn begin() -> Self {
        Self {
            start: Instant::now(),
            sampler: RssSampler::spawn(),
        }
    }

    /// Finish the measurement window and emit runtime statistics.
    pub(crate) fn finish(self) -> ReadRuntimeStats {
        let peak_rss_bytes = self
            .sampler
            .and_then(RssSampler::join)
            .filter(|bytes| *bytes > 0);

        ReadRuntimeStats {
            wall_time: self.start.elapsed(),
            peak_rss_bytes,
        }
    }
}

/// Background RSS poller. The channel sender doubles as the stop signal:
/// dropping it (explicitly in `join`, or implicitly when a failed read
/// drops the whole measurement) wakes the thread out of its sleep and ends
/// the loop, so the error path needs no cleanup of its own.
struct RssSampler {
    stop: Sender<()>,
    handle: thread::JoinHandle<u64>,
}

impl RssSampler {
    fn spawn() -> Option<Self> {
        let pid = get_current_pid().ok()?;
        let (stop, wake) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("rowboat-rss-sampler".to_string())
            .spawn(move || sample_peak_rss(pid, wake))
            .ok()?;
        Some(Self { stop, handle })
    }

    /// Stop the sampler and collect its peak, in bytes.
    fn join(self) -> Option<u64> {
        drop(self.stop);
        self.handle.join().ok()
    }
}

fn sample_peak_rss(pid: Pid, wake: Receiver<()>) -> u64 {
    let refresh = ProcessRefreshKind::new().with_memory();
    let mut system =
        System::new_with_specifics(RefreshKind::new().with_processes(refresh));

    let mut peak_kib = 0u64;
    let mut interval = FIRST_SAMPLE_INTERVAL;
    loop {
        if !system.refresh_process_specifics(pid, refresh) {
            // Targeted refresh unsupported on this platform/build.
            system.refresh_process(pid);
        }
        if let Some(process) = system.process(pid) {
            peak_kib = peak_kib.max(process.memory());
        }

        match wake.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                interval = (interval * 2).min(MAX_SAMPLE_INTERVAL);
            }
            _ => break,
        }
    }

    // sysinfo reports process memory in KiB.
    peak_kib * 1024
}
