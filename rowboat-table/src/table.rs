//! The output table
//!
//! Allocation and row count are one and the same here: `nrows()` reports the
//! allocated row capacity, and `set_nrows` grows or shrinks every column to
//! exactly that many rows. The reader driver tracks how many of those rows
//! are actually written and shrinks the table to that count when it
//! finishes.

use rowboat_core::{ReadError, Result};

use crate::buffer::RowBuffer;
use crate::column::{Column, ColumnData};
use crate::types::ColumnType;

/// Columnar output table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Create a table from column names and seeded types, with zero rows.
    pub fn new(names: Vec<String>, types: Vec<ColumnType>) -> Self {
        debug_assert_eq!(names.len(), types.len());
        let columns = names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| Column::new(name, ty))
            .collect();
        Self { columns }
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Allocated row count.
    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Resize every column to exactly `n` rows, truncating or growing with
    /// nulls.
    pub fn set_nrows(&mut self, n: usize) {
        for col in &mut self.columns {
            col.resize(n);
        }
    }

    /// Borrow the columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Borrow one column.
    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    /// Copy a chunk's buffered rows into `[row0, row0 + buffer.nrows())`.
    ///
    /// Each output column is first joined up to the buffer column's type
    /// (joins are monotone, so the flush order of concurrent chunks cannot
    /// change the final type). The buffer's string payloads are moved, not
    /// cloned; the caller clears the buffer afterwards regardless.
    pub fn write_rows(&mut self, row0: usize, buffer: &mut RowBuffer) -> Result<()> {
        if buffer.ncols() != self.columns.len() {
            return Err(ReadError::Internal(format!(
                "row buffer has {} columns, table has {}",
                buffer.ncols(),
                self.columns.len()
            )));
        }
        let nrows = buffer.nrows();
        if row0 + nrows > self.nrows() {
            return Err(ReadError::Internal(format!(
                "row range [{}, {}) exceeds allocated {} rows",
                row0,
                row0 + nrows,
                self.nrows()
            )));
        }

        for (col, bcol) in self.columns.iter_mut().zip(buffer.columns_mut()) {
            col.promote(col.column_type().join(bcol.column_type()));
            let (data, validity) = bcol.parts_mut();
            match data {
                ColumnData::Int64(values) => {
                    for (i, &value) in values.iter().enumerate().take(nrows) {
                        if validity[i] {
                            col.set_i64(row0 + i, value);
                        } else {
                            col.set_null(row0 + i);
                        }
                    }
                }
                ColumnData::Float64(values) => {
                    for (i, &value) in values.iter().enumerate().take(nrows) {
                        if validity[i] {
                            col.set_f64(row0 + i, value);
                        } else {
                            col.set_null(row0 + i);
                        }
                    }
                }
                ColumnData::Str(values) => {
                    for (i, value) in values.iter_mut().enumerate().take(nrows) {
                        if validity[i] {
                            col.set_str(row0 + i, std::mem::take(value));
                        } else {
                            col.set_null(row0 + i);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_table(ncols: usize, nrows: usize) -> Table {
        let names = (0..ncols).map(|i| format!("c{i}")).collect();
        let types = vec![ColumnType::Int64; ncols];
        let mut t = Table::new(names, types);
        t.set_nrows(nrows);
        t
    }

    fn buffer_of(fields: &[&[&str]], types: &[ColumnType]) -> RowBuffer {
        let mut buf = RowBuffer::new(types);
        for record in fields {
            for (j, field) in record.iter().enumerate() {
                buf.push_field(j, field);
            }
            buf.end_record();
        }
        buf
    }

    #[test]
    fn test_write_rows_places_values() {
        let mut t = int_table(2, 4);
        let mut buf = buffer_of(&[&["1", "2"], &["3", "4"]], &[ColumnType::Int64; 2]);
        t.write_rows(1, &mut buf).unwrap();
        match t.column(0).data() {
            ColumnData::Int64(v) => assert_eq!(&v[1..3], &[1, 3]),
            other => panic!("unexpected data: {other:?}"),
        }
        assert!(!t.column(0).is_valid(0));
        assert!(t.column(0).is_valid(2));
    }

    #[test]
    fn test_write_rows_joins_types() {
        let mut t = int_table(1, 2);
        let mut buf = buffer_of(&[&["1.5"]], &[ColumnType::Int64]);
        t.write_rows(0, &mut buf).unwrap();
        assert_eq!(t.column(0).column_type(), ColumnType::Float64);
        match t.column(0).data() {
            ColumnData::Float64(v) => assert_eq!(v[0], 1.5),
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_write_rows_out_of_range_is_internal_error() {
        let mut t = int_table(1, 1);
        let mut buf = buffer_of(&[&["1"], &["2"]], &[ColumnType::Int64]);
        let err = t.write_rows(0, &mut buf).unwrap_err();
        assert!(matches!(err, ReadError::Internal(_)));
    }

    #[test]
    fn test_set_nrows_truncates() {
        let mut t = int_table(1, 8);
        let mut buf = buffer_of(&[&["7"]], &[ColumnType::Int64]);
        t.write_rows(5, &mut buf).unwrap();
        t.set_nrows(3);
        assert_eq!(t.nrows(), 3);
    }
}
