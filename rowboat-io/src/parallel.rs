//! Parallel-loop support: error capture and the ordered commit gate
//!
//! Workers never unwind across the parallel-region boundary. Every failure
//! is handed to an [`ErrorSlot`]; once a slot trips, the remaining
//! iterations degrade to no-ops and the first captured error is rethrown in
//! the caller's context after the region joins.
//!
//! The [`CommitGate`] serializes the commit stage of the chunk loop in
//! ascending chunk-index order. The gate's mutex also carries the shared
//! write-cursor state, which makes those counters single-writer by
//! construction: only the worker whose index is up can touch them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use rowboat_core::ReadError;

/// Thread-safe single slot holding the first error raised by any worker.
pub struct ErrorSlot {
    tripped: AtomicBool,
    slot: Mutex<Option<ReadError>>,
}

impl ErrorSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
            slot: Mutex::new(None),
        }
    }

    /// Whether any worker has captured an error.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Store `err` if the slot is empty; later captures are dropped.
    pub fn capture(&self, err: ReadError) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        self.tripped.store(true, Ordering::Release);
    }

    /// Whether the captured error is the cooperative-cancellation variant.
    pub fn is_interrupt(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|e| e.is_interrupt()).unwrap_or(false)
    }

    /// Take the captured error, if any.
    pub fn take(&self) -> Option<ReadError> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared write-cursor state, touched only by the gate holder.
#[derive(Debug)]
pub(crate) struct CommitState {
    /// Chunk index whose commit turn it is.
    next_index: usize,
    /// Rows appended to the output so far.
    pub nrows_written: usize,
    /// Byte offset of the end of the last committed chunk.
    pub last_chunk_end: usize,
    /// Rows the output currently has room for.
    pub nrows_allocated: usize,
}

/// Turnstile enforcing ascending-index entry into the commit stage.
pub(crate) struct CommitGate {
    state: Mutex<CommitState>,
    turn: Condvar,
}

impl CommitGate {
    pub(crate) fn new(nrows_written: usize, last_chunk_end: usize, nrows_allocated: usize) -> Self {
        Self {
            state: Mutex::new(CommitState {
                next_index: 0,
                nrows_written,
                last_chunk_end,
                nrows_allocated,
            }),
            turn: Condvar::new(),
        }
    }

    /// Block until it is `index`'s turn, then return the state guard.
    ///
    /// Safe against deadlock because chunk indices are claimed in ascending
    /// order and each worker holds at most one unclaimed index: every
    /// predecessor of `index` is already running on some worker.
    pub(crate) fn enter(&self, index: usize) -> MutexGuard<'_, CommitState> {
        let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while st.next_index != index {
            st = self.turn.wait(st).unwrap_or_else(|e| e.into_inner());
        }
        st
    }

    /// Release the gate to the next index. Must be called exactly once per
    /// claimed chunk, error or not, or successors hang.
    pub(crate) fn leave(&self, mut st: MutexGuard<'_, CommitState>) {
        st.next_index += 1;
        drop(st);
        self.turn.notify_all();
    }

    /// Lock the state outside the ordered protocol (progress sampling,
    /// post-loop reads).
    pub(crate) fn lock(&self) -> MutexGuard<'_, CommitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Worker count to use when the caller does not pin one.
pub fn recommended_threads() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
