//! Progress gating, reporting, and cooperative cancellation
//!
//! These tests drive the reader with a parser that sleeps through each
//! chunk, so the 750 ms reporting grace period elapses mid-read without
//! needing a quarter-gigabyte input.

use std::sync::RwLock;
use std::time::Duration;

use rowboat_io::{
    ChunkCoordinates, ChunkedReader, ColumnType, ReadError, ReadStatus, RecordParser, Result,
    Table,
};
use rowboat_test_utils::{CancellingProgress, RecordingProgress};

/// Honest parser that takes its time and produces no rows.
struct SleepyParser {
    delay: Duration,
}

impl RecordParser for SleepyParser {
    fn read_chunk(
        &mut self,
        expected: &ChunkCoordinates,
        actual: &mut ChunkCoordinates,
    ) -> Result<()> {
        std::thread::sleep(self.delay);
        *actual = ChunkCoordinates::exact(expected.start, expected.end.max(expected.start));
        Ok(())
    }

    fn push_buffers(&mut self) -> Result<()> {
        Ok(())
    }

    fn order_buffer(&mut self) {}

    fn used_nrows(&self) -> usize {
        0
    }

    fn truncate_rows(&mut self, _n: usize) {}

    fn set_row0(&mut self, _row0: usize) {}
}

fn empty_table() -> RwLock<Table> {
    RwLock::new(Table::new(vec!["c0".into()], vec![ColumnType::Int64]))
}

/// 12 chunks on one thread: deterministic ordering of report timestamps.
fn sleepy_reader<'a>(
    table: &'a RwLock<Table>,
    sink: &'a dyn rowboat_io::ProgressSink,
) -> ChunkedReader<'a> {
    let input_size = 12 << 18;
    ChunkedReader::new(0, input_size, 1.0, 1, usize::MAX, table, Some(sink)).unwrap()
}

#[test]
fn progress_appears_after_grace_period_and_finishes_complete() {
    let table = empty_table();
    let sink = RecordingProgress::new();
    let mut reader = sleepy_reader(&table, &sink);
    assert_eq!(reader.plan().chunk_count, 12);

    reader
        .read_all(|_| SleepyParser {
            delay: Duration::from_millis(120),
        })
        .unwrap();

    let reports = sink.reports();
    assert!(!reports.is_empty(), "grace period should have elapsed");
    // Fractions are committed-byte ratios: within range and nondecreasing.
    for pair in reports.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    assert!(reports.iter().all(|f| (0.0..=1.0).contains(f)));

    let (fraction, status) = sink.finished().expect("final event");
    assert_eq!(status, ReadStatus::Complete);
    assert_eq!(fraction, 1.0);
}

#[test]
fn cancellation_through_the_sink_interrupts_the_read() {
    let table = empty_table();
    // First report is allowed (latching progress on), the second cancels.
    let sink = CancellingProgress::after(1);
    let mut reader = sleepy_reader(&table, &sink);

    let err = reader
        .read_all(|_| SleepyParser {
            delay: Duration::from_millis(120),
        })
        .unwrap_err();
    assert!(matches!(err, ReadError::Interrupted));
    assert_eq!(sink.finished(), Some(ReadStatus::Interrupted));
}
