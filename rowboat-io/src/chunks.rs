//! Chunked reader driver
//!
//! The driver partitions the input into roughly equal byte ranges, parses
//! them across a worker pool, and commits the parsed rows in source order.
//! Chunk boundaries are speculative: a proposed start usually lands
//! mid-record, so the parser snaps it forward and reports what it truly
//! consumed. At commit time the real end of the predecessor chunk is known,
//! and any disagreement is repaired by a single re-parse from that offset.
//!
//! The loop has two phases per chunk. The parse phase runs in parallel and
//! out of order: flush the worker's previously committed rows, compute
//! boundaries, parse. The commit phase is serialized in ascending chunk
//! index through the [`CommitGate`]: reconcile boundaries, grow the output
//! if needed, advance the write cursors, and mark the buffer for the next
//! flush. Ordering the commits (and nothing else) is what makes the output
//! row order equal the input record order while the parsing itself scales.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use rowboat_core::{ChunkCoordinates, ChunkPlan, ReadError, Result};
use rowboat_table::Table;

use crate::parallel::{recommended_threads, CommitGate, CommitState, ErrorSlot};
use crate::parser::RecordParser;
use crate::progress::{ProgressSink, ReadStatus};

/// Input size above which progress is shown from the first chunk (256 MiB).
const PROGRESS_SHOW_ALWAYS_BYTES: usize = 1 << 28;

/// Grace period before progress appears for smaller inputs.
const PROGRESS_DELAY: Duration = Duration::from_millis(750);

/// Orchestrates one read of the byte range `[sof, eof)` into a table.
pub struct ChunkedReader<'a> {
    plan: ChunkPlan,
    mean_line_len: f64,
    sof: usize,
    eof: usize,
    last_chunk_end: usize,
    nrows_written: usize,
    nrows_allocated: usize,
    nrows_max: usize,
    table: &'a RwLock<Table>,
    progress: Option<&'a dyn ProgressSink>,
}

impl<'a> std::fmt::Debug for ChunkedReader<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedReader")
            .field("plan", &self.plan)
            .field("mean_line_len", &self.mean_line_len)
            .field("sof", &self.sof)
            .field("eof", &self.eof)
            .field("last_chunk_end", &self.last_chunk_end)
            .field("nrows_written", &self.nrows_written)
            .field("nrows_allocated", &self.nrows_allocated)
            .field("nrows_max", &self.nrows_max)
            .finish_non_exhaustive()
    }
}

impl<'a> ChunkedReader<'a> {
    /// Create a driver for `[sof, eof)`. The table's current row count is
    /// taken as the initial allocation and must not exceed `nrows_max`.
    pub fn new(
        sof: usize,
        eof: usize,
        mean_line_len: f64,
        nthreads: usize,
        nrows_max: usize,
        table: &'a RwLock<Table>,
        progress: Option<&'a dyn ProgressSink>,
    ) -> Result<Self> {
        let nrows_allocated = table.read().unwrap_or_else(|e| e.into_inner()).nrows();
        if nrows_allocated > nrows_max {
            return Err(ReadError::InvalidOptions(format!(
                "table pre-allocated {} rows above the row cap {}",
                nrows_allocated, nrows_max
            )));
        }
        Ok(Self {
            plan: ChunkPlan::new(eof - sof, mean_line_len, nthreads),
            mean_line_len,
            sof,
            eof,
            last_chunk_end: sof,
            nrows_written: 0,
            nrows_allocated,
            nrows_max,
            table,
            progress,
        })
    }

    /// The chunking plan currently in force.
    pub fn plan(&self) -> ChunkPlan {
        self.plan
    }

    /// Rows committed so far (final after [`ChunkedReader::read_all`]).
    pub fn nrows_written(&self) -> usize {
        self.nrows_written
    }

    /// Byte offset of the end of the last committed chunk.
    pub fn last_chunk_end(&self) -> usize {
        self.last_chunk_end
    }

    /// Propose coordinates for chunk `i`.
    ///
    /// Chunk 0 and every chunk in sequential mode start at the known end of
    /// the committed prefix; other starts are speculative guesses that the
    /// parser snaps to a record boundary. The last chunk always ends at the
    /// input end.
    fn chunk_coordinates(&self, i: usize, last_chunk_end: usize) -> ChunkCoordinates {
        let mut c = ChunkCoordinates::default();
        if self.plan.nthreads == 1 || i == 0 {
            c.start = last_chunk_end;
            c.true_start = true;
        } else {
            c.start = self.sof + i * self.plan.chunk_size;
        }
        if i == self.plan.chunk_count - 1 {
            c.end = self.eof;
            c.true_end = true;
        } else {
            c.end = c.start + self.plan.chunk_size;
        }
        c
    }

    /// Fraction of input bytes committed, in `[0, 1]`.
    fn work_done(&self, last_chunk_end: usize) -> f64 {
        if self.eof == self.sof {
            return 1.0;
        }
        (last_chunk_end - self.sof) as f64 / (self.eof - self.sof) as f64
    }

    /// Run the chunk loop to completion, or to the first captured error.
    pub fn read_all<P, F>(&mut self, make_parser: F) -> Result<()>
    where
        P: RecordParser,
        F: Fn(usize) -> P + Sync,
    {
        // The runtime may grant fewer workers than the plan assumed; the
        // plan is pure arithmetic, so rerun it with what is available.
        let granted = recommended_threads();
        if granted < self.plan.nthreads {
            tracing::debug!(
                requested = self.plan.nthreads,
                granted,
                "fewer workers available, re-planning"
            );
            self.plan = ChunkPlan::new(self.eof - self.sof, self.mean_line_len, granted);
        }

        let errors = ErrorSlot::new();
        let gate = CommitGate::new(self.nrows_written, self.last_chunk_end, self.nrows_allocated);
        let next_chunk = AtomicUsize::new(0);

        {
            let this = &*self;
            let errors = &errors;
            let gate = &gate;
            let next_chunk = &next_chunk;
            let make_parser = &make_parser;
            std::thread::scope(|scope| {
                for worker in 0..this.plan.nthreads {
                    scope.spawn(move || {
                        let parser = make_parser(worker);
                        this.worker_loop(worker, parser, gate, errors, next_chunk);
                    });
                }
            });
        }

        {
            let st = gate.lock();
            self.nrows_written = st.nrows_written;
            self.last_chunk_end = st.last_chunk_end;
            self.nrows_allocated = st.nrows_allocated;
        }

        if let Some(err) = errors.take() {
            return Err(err);
        }

        // Shrink the output to exactly the rows written.
        self.table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .set_nrows(self.nrows_written);
        self.nrows_allocated = self.nrows_written;

        // Unless the row cap stopped the read early, the committed chunks
        // must tile the input exactly.
        if self.nrows_written < self.nrows_max {
            debug_assert_eq!(self.last_chunk_end, self.eof, "input not fully consumed");
        }
        Ok(())
    }

    fn worker_loop<P: RecordParser>(
        &self,
        worker: usize,
        mut parser: P,
        gate: &CommitGate,
        errors: &ErrorSlot,
        next_chunk: &AtomicUsize,
    ) {
        // Only the master worker reports progress: the sink may reach into
        // a host runtime that tolerates a single caller.
        let show_progress = self.progress.is_some() && worker == 0;
        let mut show_always =
            show_progress && (self.eof - self.sof > PROGRESS_SHOW_ALWAYS_BYTES);
        let show_when = Instant::now() + PROGRESS_DELAY;

        let mut expected = ChunkCoordinates::default();
        let mut actual = ChunkCoordinates::default();

        loop {
            // Claim the next chunk even after an error: every claimed index
            // must pass through the gate or successors would wait forever.
            let i = next_chunk.fetch_add(1, Ordering::Relaxed);
            if i >= self.plan.chunk_count {
                break;
            }

            if !errors.is_tripped() {
                let parsed = self.parse_phase(
                    i,
                    &mut parser,
                    gate,
                    &mut expected,
                    &mut actual,
                    show_progress,
                    &mut show_always,
                    show_when,
                );
                if let Err(err) = parsed {
                    errors.capture(err);
                }
            }

            let mut st = gate.enter(i);
            if !errors.is_tripped() {
                if let Err(err) =
                    self.commit_phase(i, &mut st, &mut parser, &mut actual, &mut expected)
                {
                    errors.capture(err);
                }
            }
            gate.leave(st);
        }

        // On error the buffered rows were never ordered; pushing them could
        // land rows at stale offsets.
        if errors.is_tripped() {
            parser.truncate_rows(0);
        }
        if parser.used_nrows() > 0 {
            if let Err(err) = parser.push_buffers() {
                errors.capture(err);
            }
        }

        if show_always {
            let status = if errors.is_tripped() {
                if errors.is_interrupt() {
                    ReadStatus::Interrupted
                } else {
                    ReadStatus::Error
                }
            } else {
                ReadStatus::Complete
            };
            let fraction = self.work_done(gate.lock().last_chunk_end);
            if let Some(sink) = self.progress {
                sink.finish(fraction, status);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_phase<P: RecordParser>(
        &self,
        i: usize,
        parser: &mut P,
        gate: &CommitGate,
        expected: &mut ChunkCoordinates,
        actual: &mut ChunkCoordinates,
        show_progress: bool,
        show_always: &mut bool,
        show_when: Instant,
    ) -> Result<()> {
        if *show_always || (show_progress && Instant::now() >= show_when) {
            let fraction = self.work_done(gate.lock().last_chunk_end);
            if let Some(sink) = self.progress {
                if !sink.report(fraction) {
                    return Err(ReadError::Interrupted);
                }
            }
            *show_always = true;
        }

        // Flush the rows this worker committed last iteration; their slot
        // in the output was fixed at that commit.
        parser.push_buffers()?;

        *expected = self.chunk_coordinates(i, gate.lock().last_chunk_end);
        parser.adjust_chunk_coordinates(expected);
        parser.read_chunk(expected, actual)?;
        Ok(())
    }

    fn commit_phase<P: RecordParser>(
        &self,
        i: usize,
        st: &mut CommitState,
        parser: &mut P,
        actual: &mut ChunkCoordinates,
        expected: &mut ChunkCoordinates,
    ) -> Result<()> {
        parser.set_row0(st.nrows_written);
        self.order_chunk(st, actual, expected, parser)?;

        let mut nrows_new = st.nrows_written + parser.used_nrows();
        if nrows_new > st.nrows_allocated {
            if st.nrows_allocated == self.nrows_max {
                // At the row cap: truncate the chunk instead of growing.
                parser.truncate_rows(st.nrows_allocated - st.nrows_written);
                nrows_new = st.nrows_allocated;
            } else {
                self.realloc_columns(i, nrows_new, st)?;
                if nrows_new > st.nrows_allocated {
                    // Growth was clamped at the row cap mid-chunk.
                    parser.truncate_rows(st.nrows_allocated - st.nrows_written);
                    nrows_new = st.nrows_allocated;
                }
            }
        }
        st.nrows_written = nrows_new;

        parser.order_buffer();
        Ok(())
    }

    /// Reconcile the actual extent of a chunk with the committed prefix.
    ///
    /// Workers speculate at guessed offsets; here the true end of the
    /// predecessor is known, so a shortfall or overlap is repaired by one
    /// re-parse from that offset. Two attempts bound the retry: the second
    /// starts at a true boundary, so a remaining mismatch means the parser
    /// broke its contract.
    fn order_chunk<P: RecordParser>(
        &self,
        st: &mut CommitState,
        actual: &mut ChunkCoordinates,
        expected: &mut ChunkCoordinates,
        parser: &mut P,
    ) -> Result<()> {
        for attempt in 0..2 {
            if actual.start == st.last_chunk_end && actual.end >= st.last_chunk_end {
                st.last_chunk_end = actual.end;
                return Ok(());
            }
            if attempt == 1 {
                break;
            }
            expected.start = st.last_chunk_end;
            expected.true_start = true;
            parser.read_chunk(expected, actual)?;
        }
        Err(ReadError::Internal(format!(
            "chunk reconciliation failed to converge at byte offset {}",
            st.last_chunk_end
        )))
    }

    /// Grow the output when a chunk commits more rows than allocated.
    ///
    /// The last chunk asks for exactly what it needs; earlier chunks
    /// project the final size from the rows seen so far with 1.2x slack,
    /// with a +1024 floor so sparse inputs do not grow a few rows at a
    /// time. The result is clamped to the row cap.
    fn realloc_columns(&self, ichunk: usize, new_required: usize, st: &mut CommitState) -> Result<()> {
        let new_alloc = if ichunk == self.plan.chunk_count - 1 {
            new_required
        } else {
            let projected =
                1.2 * new_required as f64 * self.plan.chunk_count as f64 / (ichunk + 1) as f64;
            (projected.ceil() as usize).max(st.nrows_allocated + 1024)
        };
        let new_alloc = new_alloc.min(self.nrows_max);
        st.nrows_allocated = new_alloc;
        tracing::debug!(rows = new_alloc, chunk = ichunk, "output under-allocated, growing");

        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        table.set_nrows(new_alloc);
        Ok(())
    }
}
