//! Record parsing
//!
//! [`RecordParser`] is the per-worker surface the chunk driver talks to. One
//! parser is created per worker at the start of the parallel region and owns
//! that worker's scratch buffer for its whole lifetime; parsers are never
//! shared.
//!
//! [`CsvChunkParser`] is the concrete delimited-text implementation. Records
//! are newline-terminated; quoting is honored within a record but a quoted
//! field cannot span records (speculative chunk boundaries are snapped to
//! newlines, so an embedded record terminator would make the boundary scan
//! ambiguous).

use std::borrow::Cow;
use std::sync::RwLock;

use memchr::memchr;
use smallvec::SmallVec;

use rowboat_core::{ChunkCoordinates, Dialect, Limits, RaggedMode, ReadError, Result};
use rowboat_table::{ColumnType, RowBuffer, Table};

/// Per-worker parse driver used by the chunk orchestrator.
pub trait RecordParser {
    /// Parse `[expected.start, expected.end)` into the worker's buffer.
    ///
    /// On return `actual` holds the range truly consumed: the start snapped
    /// forward to a record boundary when `expected.true_start` is false, and
    /// the end extended past `expected.end` when the last record begun
    /// before it runs longer.
    fn read_chunk(
        &mut self,
        expected: &ChunkCoordinates,
        actual: &mut ChunkCoordinates,
    ) -> Result<()>;

    /// Flush the previously ordered rows into the output at their assigned
    /// row offset. A no-op when nothing is ordered.
    fn push_buffers(&mut self) -> Result<()>;

    /// Mark the buffered rows ready for the next `push_buffers`. Called
    /// once per successfully committed chunk.
    fn order_buffer(&mut self);

    /// Rows currently buffered from the last `read_chunk`.
    fn used_nrows(&self) -> usize;

    /// Drop buffered rows beyond the first `n` (row-cap truncation; `0`
    /// discards the chunk).
    fn truncate_rows(&mut self, n: usize);

    /// Assign the output row offset for the buffered chunk.
    fn set_row0(&mut self, row0: usize);

    /// Optional hook letting the parser nudge proposed chunk boundaries
    /// before the chunk is read. The default leaves them untouched.
    fn adjust_chunk_coordinates(&self, _coords: &mut ChunkCoordinates) {}
}

/// Split one record into fields, honoring the dialect's quoting.
///
/// A field wrapped in quotes has its quotes stripped and doubled quotes
/// unescaped; bytes between a closing quote and the next separator are kept
/// verbatim. An unterminated quote consumes the rest of the record.
pub(crate) fn split_record<'l>(
    line: &'l [u8],
    dialect: &Dialect,
    max_field_len: usize,
) -> std::result::Result<SmallVec<[Cow<'l, str>; 16]>, String> {
    let mut fields = SmallVec::new();
    let mut pos = 0usize;
    loop {
        let (field, next) = take_field(line, pos, dialect);
        if field.len() > max_field_len {
            return Err(format!(
                "field of {} bytes exceeds max_field_len ({})",
                field.len(),
                max_field_len
            ));
        }
        fields.push(field);
        match next {
            Some(p) => pos = p,
            None => return Ok(fields),
        }
    }
}

/// Extract the field starting at `pos`. Returns the field and the start of
/// the next field, or `None` at end of record.
fn take_field<'l>(
    line: &'l [u8],
    pos: usize,
    dialect: &Dialect,
) -> (Cow<'l, str>, Option<usize>) {
    if pos < line.len() && line[pos] == dialect.quote {
        return take_quoted_field(line, pos, dialect);
    }
    match memchr(dialect.separator, &line[pos..]) {
        Some(i) => (
            String::from_utf8_lossy(&line[pos..pos + i]),
            Some(pos + i + 1),
        ),
        None => (String::from_utf8_lossy(&line[pos..]), None),
    }
}

fn take_quoted_field<'l>(
    line: &'l [u8],
    pos: usize,
    dialect: &Dialect,
) -> (Cow<'l, str>, Option<usize>) {
    let mut unescaped: Option<String> = None;
    let mut scan = pos + 1;
    let close = loop {
        match memchr(dialect.quote, &line[scan..]) {
            Some(i) => {
                let at = scan + i;
                if line.get(at + 1) == Some(&dialect.quote) {
                    // Doubled quote: switch to owned accumulation.
                    let acc = unescaped.get_or_insert_with(String::new);
                    acc.push_str(&String::from_utf8_lossy(&line[scan..at]));
                    acc.push(dialect.quote as char);
                    scan = at + 2;
                } else {
                    break Some(at);
                }
            }
            None => break None,
        }
    };

    let Some(close) = close else {
        // Unterminated quote: the rest of the record is the field.
        let tail = String::from_utf8_lossy(&line[scan..]);
        let field = match unescaped {
            Some(mut acc) => {
                acc.push_str(&tail);
                Cow::Owned(acc)
            }
            None => tail,
        };
        return (field, None);
    };

    let mut field = match unescaped {
        Some(mut acc) => {
            acc.push_str(&String::from_utf8_lossy(&line[scan..close]));
            Cow::Owned(acc)
        }
        None => String::from_utf8_lossy(&line[scan..close]),
    };

    // Anything between the closing quote and the separator rides along.
    let after = close + 1;
    let (suffix_end, next) = match memchr(dialect.separator, &line[after..]) {
        Some(i) => (after + i, Some(after + i + 1)),
        None => (line.len(), None),
    };
    if suffix_end > after {
        field
            .to_mut()
            .push_str(&String::from_utf8_lossy(&line[after..suffix_end]));
    }
    (field, next)
}

/// Delimited-text implementation of [`RecordParser`].
pub struct CsvChunkParser<'a> {
    input: &'a [u8],
    dialect: Dialect,
    ragged: RaggedMode,
    limits: Limits,
    ncols: usize,
    table: &'a RwLock<Table>,
    buffer: RowBuffer,
    row0: usize,
    ordered: bool,
}

impl<'a> CsvChunkParser<'a> {
    /// Create a parser over `input` writing into `table`, with the buffer
    /// seeded from the sniffed column types.
    pub fn new(
        input: &'a [u8],
        types: &[ColumnType],
        dialect: Dialect,
        ragged: RaggedMode,
        limits: Limits,
        table: &'a RwLock<Table>,
    ) -> Self {
        Self {
            input,
            dialect,
            ragged,
            limits,
            ncols: types.len(),
            table,
            buffer: RowBuffer::new(types),
            row0: 0,
            ordered: false,
        }
    }

    /// Find the end of the record starting at `pos`: the content end
    /// (CR trimmed) and the start of the next record.
    fn record_end(&self, pos: usize) -> Result<(usize, usize)> {
        let eof = self.input.len();
        let window_end = eof.min(pos.saturating_add(self.limits.max_record_len));
        match memchr(b'\n', &self.input[pos..window_end]) {
            Some(i) => {
                let nl = pos + i;
                let content_end = if nl > pos && self.input[nl - 1] == b'\r' {
                    nl - 1
                } else {
                    nl
                };
                Ok((content_end, nl + 1))
            }
            None if window_end == eof => Ok((eof, eof)),
            None => Err(ReadError::LimitExceeded(format!(
                "record at byte offset {} exceeds max_record_len ({})",
                pos, self.limits.max_record_len
            ))),
        }
    }

    fn parse_record(&mut self, content_end: usize, pos: usize) -> Result<()> {
        let line = &self.input[pos..content_end];
        let fields = split_record(line, &self.dialect, self.limits.max_field_len)
            .map_err(|message| ReadError::Parse {
                offset: pos,
                message,
            })?;
        if fields.len() != self.ncols && self.ragged == RaggedMode::Error {
            return Err(ReadError::Parse {
                offset: pos,
                message: format!("expected {} fields, found {}", self.ncols, fields.len()),
            });
        }
        for col in 0..self.ncols {
            match fields.get(col) {
                Some(field) => self.buffer.push_field(col, field),
                None => self.buffer.push_null(col),
            }
        }
        self.buffer.end_record();
        Ok(())
    }
}

impl RecordParser for CsvChunkParser<'_> {
    fn read_chunk(
        &mut self,
        expected: &ChunkCoordinates,
        actual: &mut ChunkCoordinates,
    ) -> Result<()> {
        self.buffer.clear();
        self.ordered = false;

        let eof = self.input.len();
        let mut pos = expected.start.min(eof);
        if !expected.true_start {
            // Snap forward to the byte after the next record terminator.
            pos = match memchr(b'\n', &self.input[pos..]) {
                Some(i) => pos + i + 1,
                None => eof,
            };
        }
        actual.start = pos;
        actual.true_start = true;

        // A record that begins before the nominal end is consumed fully,
        // even when it finishes past it.
        while pos < expected.end && pos < eof {
            let (content_end, next_pos) = self.record_end(pos)?;
            if content_end > pos {
                self.parse_record(content_end, pos)?;
            }
            pos = next_pos;
        }

        actual.end = pos.max(actual.start);
        actual.true_end = true;
        Ok(())
    }

    fn push_buffers(&mut self) -> Result<()> {
        if !self.ordered || self.buffer.nrows() == 0 {
            return Ok(());
        }
        {
            let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
            table.write_rows(self.row0, &mut self.buffer)?;
        }
        self.buffer.clear();
        self.ordered = false;
        Ok(())
    }

    fn order_buffer(&mut self) {
        self.ordered = true;
    }

    fn used_nrows(&self) -> usize {
        self.buffer.nrows()
    }

    fn truncate_rows(&mut self, n: usize) {
        self.buffer.truncate(n);
    }

    fn set_row0(&mut self, row0: usize) {
        self.row0 = row0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture<'a>(input: &'a [u8], ncols: usize, table: &'a RwLock<Table>) -> CsvChunkParser<'a> {
        CsvChunkParser::new(
            input,
            &vec![ColumnType::Int64; ncols],
            Dialect::default(),
            RaggedMode::Error,
            Limits::default(),
            table,
        )
    }

    fn table_for(ncols: usize, nrows: usize) -> RwLock<Table> {
        let mut t = Table::new(
            (0..ncols).map(|i| format!("c{i}")).collect(),
            vec![ColumnType::Int64; ncols],
        );
        t.set_nrows(nrows);
        RwLock::new(t)
    }

    #[test]
    fn test_split_record_plain() {
        let d = Dialect::default();
        let fields = split_record(b"a,b,,d", &d, 1024).unwrap();
        assert_eq!(fields.as_slice(), &["a", "b", "", "d"]);
    }

    #[test]
    fn test_split_record_quoted() {
        let d = Dialect::default();
        let fields = split_record(b"\"a,b\",\"he said \"\"hi\"\"\",c", &d, 1024).unwrap();
        assert_eq!(fields.as_slice(), &["a,b", "he said \"hi\"", "c"]);
    }

    #[test]
    fn test_split_record_unterminated_quote_takes_rest() {
        let d = Dialect::default();
        let fields = split_record(b"\"abc,def", &d, 1024).unwrap();
        assert_eq!(fields.as_slice(), &["abc,def"]);
    }

    #[test]
    fn test_split_record_field_limit() {
        let d = Dialect::default();
        assert!(split_record(b"abcdef", &d, 3).is_err());
    }

    #[test]
    fn test_true_start_parses_from_offset_zero() {
        let input = b"1,2\n3,4\n";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        let expected = ChunkCoordinates::exact(0, input.len());
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(parser.used_nrows(), 2);
        assert_eq!(actual, ChunkCoordinates::exact(0, input.len()));
    }

    #[test]
    fn test_speculative_start_snaps_to_next_record() {
        let input = b"1,2\n3,4\n5,6\n";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        // Start mid-record: snaps to offset 4 (after the first newline).
        let expected = ChunkCoordinates {
            start: 1,
            end: input.len(),
            true_start: false,
            true_end: true,
        };
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(actual.start, 4);
        assert_eq!(parser.used_nrows(), 2);
    }

    #[test]
    fn test_record_begun_before_end_is_consumed_fully() {
        let input = b"1,2\n333333,4\n5,6\n";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        // Nominal end lands inside the second record; the parser keeps going
        // to that record's terminator at offset 13.
        let expected = ChunkCoordinates {
            start: 0,
            end: 6,
            true_start: true,
            true_end: false,
        };
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(parser.used_nrows(), 2);
        assert_eq!(actual.end, 13);
    }

    #[test]
    fn test_final_unterminated_line_and_crlf() {
        let input = b"1,2\r\n3,4";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        let expected = ChunkCoordinates::exact(0, input.len());
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(parser.used_nrows(), 2);
        assert_eq!(actual.end, input.len());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = b"1,2\n\n3,4\n";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        let expected = ChunkCoordinates::exact(0, input.len());
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(parser.used_nrows(), 2);
    }

    #[test]
    fn test_ragged_record_errors_by_default() {
        let input = b"1,2\n3\n";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        let expected = ChunkCoordinates::exact(0, input.len());
        let mut actual = ChunkCoordinates::default();
        let err = parser.read_chunk(&expected, &mut actual).unwrap_err();
        assert!(matches!(err, ReadError::Parse { offset: 4, .. }));
    }

    #[test]
    fn test_ragged_permissive_pads_and_drops() {
        let input = b"1,2\n3\n4,5,6\n";
        let table = table_for(2, 4);
        let mut parser = CsvChunkParser::new(
            input,
            &[ColumnType::Int64; 2],
            Dialect::default(),
            RaggedMode::Permissive,
            Limits::default(),
            &table,
        );
        let expected = ChunkCoordinates::exact(0, input.len());
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(parser.used_nrows(), 3);
    }

    #[test]
    fn test_push_only_after_order() {
        let input = b"1,2\n3,4\n";
        let table = table_for(2, 4);
        let mut parser = fixture(input, 2, &table);
        let expected = ChunkCoordinates::exact(0, input.len());
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();

        // Not ordered yet: push is a no-op.
        parser.push_buffers().unwrap();
        assert_eq!(parser.used_nrows(), 2);

        parser.set_row0(0);
        parser.order_buffer();
        parser.push_buffers().unwrap();
        assert_eq!(parser.used_nrows(), 0);

        let t = table.read().unwrap();
        assert!(t.column(0).is_valid(1));
        match t.column(1).data() {
            rowboat_table::ColumnData::Int64(v) => assert_eq!(&v[..2], &[2, 4]),
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_chunk_with_no_newline_consumes_nothing() {
        let input = b"aaaaaaaaaaaaaaaa";
        let table = table_for(1, 4);
        let mut parser = fixture(input, 1, &table);
        let expected = ChunkCoordinates {
            start: 2,
            end: 8,
            true_start: false,
            true_end: false,
        };
        let mut actual = ChunkCoordinates::default();
        parser.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(parser.used_nrows(), 0);
        assert_eq!(actual.start, input.len());
        assert_eq!(actual.end, input.len());
    }
}
