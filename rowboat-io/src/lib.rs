//! Rowboat I/O - Parallel delimited-text reading
//!
//! This crate provides the reading layer and high-level APIs for rowboat:
//!
//! - The chunked reader driver with ordered parallel commits
//! - The concrete CSV record parser
//! - Input sampling (separator, header, seed types, line-length estimate)
//! - Progress reporting and cooperative cancellation
//! - High-level `read_path` / `read_bytes` entry points

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod chunks;
pub mod parallel;
pub mod parser;
pub mod progress;
pub mod sniff;

mod runtime;

// Re-export commonly used types
pub use chunks::ChunkedReader;
pub use parallel::{recommended_threads, ErrorSlot};
pub use parser::{CsvChunkParser, RecordParser};
pub use progress::{ProgressSink, ReadStatus};
pub use rowboat_core::{
    ChunkCoordinates, ChunkPlan, Dialect, HeaderMode, Limits, RaggedMode, ReadError, Result,
};
pub use rowboat_table::{Column, ColumnData, ColumnType, Table};
pub use runtime::ReadRuntimeStats;
pub use sniff::{sniff, Sniff};

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use runtime::RuntimeMeasurement;

/// High-level read options
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Separator/quote convention; `None` sniffs it from the input.
    pub dialect: Option<Dialect>,
    /// Header interpretation for the first record.
    pub header: HeaderMode,
    /// Policy for records whose field count differs from the schema.
    pub ragged: RaggedMode,
    /// Worker threads; `0` uses all available parallelism.
    pub nthreads: usize,
    /// Hard cap on output rows; chunks past the cap are truncated.
    pub max_rows: usize,
    /// Security limits
    pub limits: Limits,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            dialect: None,
            header: HeaderMode::Auto,
            ragged: RaggedMode::Error,
            nthreads: 0,
            max_rows: usize::MAX,
            limits: Limits::default(),
        }
    }
}

/// Outcome of a read: the table plus run statistics.
#[derive(Debug)]
pub struct ReadSummary {
    /// The populated output table.
    pub table: Table,
    /// Rows in the table.
    pub nrows: usize,
    /// Columns in the table.
    pub ncols: usize,
    /// Bytes of input processed.
    pub bytes_read: usize,
    /// Chunks the input was split into.
    pub chunk_count: usize,
    /// Worker threads used.
    pub nthreads: usize,
    /// Wall-clock duration of the read.
    pub wall_time: Duration,
    /// Peak resident set size during the read, if sampled.
    pub peak_rss_bytes: Option<u64>,
}

/// Read a delimited-text file into a columnar table.
pub fn read_path(
    path: impl AsRef<Path>,
    options: &ReadOptions,
    progress: Option<&dyn ProgressSink>,
) -> Result<ReadSummary> {
    let bytes = std::fs::read(path)?;
    read_bytes(&bytes, options, progress)
}

/// Read an in-memory byte range into a columnar table.
pub fn read_bytes(
    input: &[u8],
    options: &ReadOptions,
    progress: Option<&dyn ProgressSink>,
) -> Result<ReadSummary> {
    let measurement = RuntimeMeasurement::begin();

    let sniffed = sniff(input, options.dialect, options.header, &options.limits)?;
    if sniffed.ncols() == 0 {
        let stats = measurement.finish();
        return Ok(ReadSummary {
            table: Table::default(),
            nrows: 0,
            ncols: 0,
            bytes_read: input.len(),
            chunk_count: 0,
            nthreads: 0,
            wall_time: stats.wall_time,
            peak_rss_bytes: stats.peak_rss_bytes,
        });
    }

    let sof = sniffed.data_start;
    let eof = input.len();
    let requested = if options.nthreads == 0 {
        recommended_threads()
    } else {
        options.nthreads
    };

    // Pre-allocate from the sampled line length with 5% slack; the driver
    // grows the table if the estimate runs short.
    let estimated = ((eof - sof) as f64 / sniffed.mean_line_len * 1.05) as usize + 1;
    let mut table = Table::new(sniffed.names.clone(), sniffed.types.clone());
    table.set_nrows(estimated.min(options.max_rows));
    let table = RwLock::new(table);

    let mut reader = ChunkedReader::new(
        sof,
        eof,
        sniffed.mean_line_len,
        requested,
        options.max_rows,
        &table,
        progress,
    )?;
    reader.read_all(|_worker| {
        CsvChunkParser::new(
            input,
            &sniffed.types,
            sniffed.dialect,
            options.ragged,
            options.limits.clone(),
            &table,
        )
    })?;

    let plan = reader.plan();
    let nrows = reader.nrows_written();
    let stats = measurement.finish();
    let table = table.into_inner().unwrap_or_else(|e| e.into_inner());

    Ok(ReadSummary {
        ncols: table.ncols(),
        table,
        nrows,
        bytes_read: eof,
        chunk_count: plan.chunk_count,
        nthreads: plan.nthreads,
        wall_time: stats.wall_time,
        peak_rss_bytes: stats.peak_rss_bytes,
    })
}
