//! Chunking strategy
//!
//! Decides how many chunks the input is split into, how large each chunk is,
//! and how many worker threads are actually worth running. The plan is pure
//! arithmetic over three inputs (input size, estimated mean line length,
//! requested thread count), so it can be recomputed at any time; the
//! orchestrator re-plans when the runtime grants fewer workers than requested.

/// Floor on the chunk size: 256 KiB.
const MIN_CHUNK_SIZE: usize = 1 << 18;

/// Target number of average-length lines per chunk.
const LINES_PER_CHUNK: f64 = 1000.0;

/// Result of the chunking computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Size of each chunk in bytes (the last chunk absorbs the remainder).
    pub chunk_size: usize,
    /// Total number of chunks.
    pub chunk_count: usize,
    /// Effective worker count, possibly reduced from the request.
    pub nthreads: usize,
}

impl ChunkPlan {
    /// Compute a chunking plan.
    ///
    /// `mean_line_len` is clamped to at least 1.0 and `nthreads` to at
    /// least 1. The chunk size starts at ~1000 average lines with a 256 KiB
    /// floor; the chunk count is then rounded up to a multiple of `nthreads`
    /// so workers receive even shares, unless the input is so small that
    /// fewer chunks than threads exist, in which case the thread count drops
    /// to the chunk count instead of summoning idle workers.
    pub fn new(input_size: usize, mean_line_len: f64, nthreads: usize) -> Self {
        let line_len = mean_line_len.max(1.0);
        let nthreads = nthreads.max(1);

        let size1000 = (LINES_PER_CHUNK * line_len) as usize;
        let mut chunk_size = size1000.max(MIN_CHUNK_SIZE);
        let mut chunk_count = (input_size / chunk_size).max(1);

        let effective_threads = if chunk_count > nthreads {
            chunk_count = nthreads * (1 + (chunk_count - 1) / nthreads);
            nthreads
        } else {
            chunk_count
        };
        chunk_size = input_size / chunk_count;

        Self {
            chunk_size,
            chunk_count,
            nthreads: effective_threads,
        }
    }
}
