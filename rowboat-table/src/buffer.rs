//! Chunk-local row buffer
//!
//! Each worker parses its chunk into a `RowBuffer` before any of it touches
//! the shared table. Buffer columns ride the same type ladder as output
//! columns: a cell that fails to parse at the current type widens the
//! buffer column locally, and the table column is joined up at flush time.

use bitvec::prelude::*;

use crate::column::ColumnData;
use crate::types::{parse_f64, parse_i64, ColumnType};

/// One column's worth of buffered values.
#[derive(Debug)]
pub struct BufferColumn {
    data: ColumnData,
    validity: BitVec<u8, Lsb0>,
}

impl BufferColumn {
    fn new(ty: ColumnType) -> Self {
        let data = match ty {
            ColumnType::Int64 => ColumnData::Int64(Vec::new()),
            ColumnType::Float64 => ColumnData::Float64(Vec::new()),
            ColumnType::Str => ColumnData::Str(Vec::new()),
        };
        Self {
            data,
            validity: BitVec::new(),
        }
    }

    /// Current type of the buffered values.
    pub fn column_type(&self) -> ColumnType {
        match &self.data {
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Float64(_) => ColumnType::Float64,
            ColumnData::Str(_) => ColumnType::Str,
        }
    }

    /// Borrow the buffered values.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Whether the buffered value at `idx` is non-null.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity[idx]
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn push_field(&mut self, field: &str) {
        loop {
            match &mut self.data {
                ColumnData::Int64(v) => {
                    if let Some(x) = parse_i64(field) {
                        v.push(x);
                        break;
                    }
                }
                ColumnData::Float64(v) => {
                    if let Some(x) = parse_f64(field) {
                        v.push(x);
                        break;
                    }
                }
                ColumnData::Str(v) => {
                    v.push(field.to_string());
                    break;
                }
            }
            self.widen_to(self.column_type().fit(field));
        }
        self.validity.push(true);
    }

    fn push_null(&mut self) {
        match &mut self.data {
            ColumnData::Int64(v) => v.push(0),
            ColumnData::Float64(v) => v.push(0.0),
            ColumnData::Str(v) => v.push(String::new()),
        }
        self.validity.push(false);
    }

    fn widen_to(&mut self, to: ColumnType) {
        let old = std::mem::replace(&mut self.data, ColumnData::Int64(Vec::new()));
        self.data = old.widen(to, &self.validity);
    }

    fn truncate(&mut self, n: usize) {
        match &mut self.data {
            ColumnData::Int64(v) => v.truncate(n),
            ColumnData::Float64(v) => v.truncate(n),
            ColumnData::Str(v) => v.truncate(n),
        }
        self.validity.truncate(n);
    }

    fn clear(&mut self) {
        self.truncate(0);
    }

    /// Split borrow: mutable values alongside the validity bits, so a
    /// caller can drain payloads while consulting nullness.
    pub(crate) fn parts_mut(&mut self) -> (&mut ColumnData, &BitSlice<u8, Lsb0>) {
        (&mut self.data, &self.validity)
    }
}

/// All buffered rows for one parsed chunk.
#[derive(Debug)]
pub struct RowBuffer {
    cols: Vec<BufferColumn>,
    nrows: usize,
}

impl RowBuffer {
    /// Create a buffer seeded with the sniffed column types.
    pub fn new(types: &[ColumnType]) -> Self {
        Self {
            cols: types.iter().map(|&ty| BufferColumn::new(ty)).collect(),
            nrows: 0,
        }
    }

    /// Number of complete buffered records.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    /// Borrow the buffer columns.
    pub fn columns(&self) -> &[BufferColumn] {
        &self.cols
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [BufferColumn] {
        &mut self.cols
    }

    /// Append one field of the record currently being assembled. An empty
    /// field is a null.
    pub fn push_field(&mut self, col: usize, field: &str) {
        if field.is_empty() {
            self.cols[col].push_null();
        } else {
            self.cols[col].push_field(field);
        }
    }

    /// Append a null field.
    pub fn push_null(&mut self, col: usize) {
        self.cols[col].push_null();
    }

    /// Seal the record currently being assembled. Every column must have
    /// received exactly one field since the previous call.
    pub fn end_record(&mut self) {
        self.nrows += 1;
        debug_assert!(self.cols.iter().all(|c| c.len() == self.nrows));
    }

    /// Drop buffered records beyond the first `n`. Used when the row cap
    /// truncates a committed chunk.
    pub fn truncate(&mut self, n: usize) {
        if n >= self.nrows {
            return;
        }
        for col in &mut self.cols {
            col.truncate(n);
        }
        self.nrows = n;
    }

    /// Discard all buffered records, keeping column types.
    pub fn clear(&mut self) {
        for col in &mut self.cols {
            col.clear();
        }
        self.nrows = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_rides_the_ladder() {
        let mut buf = RowBuffer::new(&[ColumnType::Int64]);
        buf.push_field(0, "1");
        buf.end_record();
        buf.push_field(0, "2.5");
        buf.end_record();
        assert_eq!(buf.columns()[0].column_type(), ColumnType::Float64);
        match buf.columns()[0].data() {
            ColumnData::Float64(v) => assert_eq!(v, &vec![1.0, 2.5]),
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_widening_preserves_earlier_nulls() {
        let mut buf = RowBuffer::new(&[ColumnType::Int64]);
        buf.push_field(0, "3");
        buf.end_record();
        buf.push_null(0);
        buf.end_record();
        buf.push_field(0, "hello");
        buf.end_record();
        let col = &buf.columns()[0];
        assert_eq!(col.column_type(), ColumnType::Str);
        assert!(col.is_valid(0));
        assert!(!col.is_valid(1));
        match col.data() {
            ColumnData::Str(v) => assert_eq!(v, &vec!["3".to_string(), String::new(), "hello".to_string()]),
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_and_clear() {
        let mut buf = RowBuffer::new(&[ColumnType::Int64, ColumnType::Str]);
        for i in 0..5 {
            buf.push_field(0, &i.to_string());
            buf.push_field(1, "x");
            buf.end_record();
        }
        buf.truncate(2);
        assert_eq!(buf.nrows(), 2);
        buf.clear();
        assert_eq!(buf.nrows(), 0);
        assert_eq!(buf.columns()[0].column_type(), ColumnType::Int64);
    }
}
