//! A single output column: typed values plus a validity bitmap

use bitvec::prelude::*;

use crate::types::ColumnType;

/// Typed value storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// 64-bit signed integers.
    Int64(Vec<i64>),
    /// 64-bit floats.
    Float64(Vec<f64>),
    /// UTF-8 strings.
    Str(Vec<String>),
}

impl ColumnData {
    fn with_capacity(ty: ColumnType, capacity: usize) -> Self {
        match ty {
            ColumnType::Int64 => ColumnData::Int64(Vec::with_capacity(capacity)),
            ColumnType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
            ColumnType::Str => ColumnData::Str(Vec::with_capacity(capacity)),
        }
    }

    fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    fn resize(&mut self, n: usize) {
        match self {
            ColumnData::Int64(v) => v.resize(n, 0),
            ColumnData::Float64(v) => v.resize(n, 0.0),
            ColumnData::Str(v) => v.resize(n, String::new()),
        }
    }

    /// Convert to a wider type on the ladder, rendering through `validity`
    /// so null slots stay empty. Narrowing requests return the data as-is.
    pub(crate) fn widen(self, to: ColumnType, validity: &BitSlice<u8, Lsb0>) -> ColumnData {
        match (self, to) {
            (ColumnData::Int64(v), ColumnType::Float64) => {
                ColumnData::Float64(v.into_iter().map(|x| x as f64).collect())
            }
            (ColumnData::Int64(v), ColumnType::Str) => ColumnData::Str(
                v.into_iter()
                    .enumerate()
                    .map(|(i, x)| if validity[i] { x.to_string() } else { String::new() })
                    .collect(),
            ),
            (ColumnData::Float64(v), ColumnType::Str) => ColumnData::Str(
                v.into_iter()
                    .enumerate()
                    .map(|(i, x)| if validity[i] { x.to_string() } else { String::new() })
                    .collect(),
            ),
            (data, _) => data,
        }
    }
}

/// One named output column with null tracking.
///
/// The validity bitmap has one bit per allocated row; a cleared bit marks a
/// null. Rows between the written count and the allocated count hold default
/// values with their validity bits cleared.
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name, from the header row or synthesized.
    pub name: String,
    data: ColumnData,
    validity: BitVec<u8, Lsb0>,
}

impl Column {
    /// Create an empty column of the given type.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::with_capacity(ty, 0),
            validity: BitVec::new(),
        }
    }

    /// Current physical type.
    pub fn column_type(&self) -> ColumnType {
        match &self.data {
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Float64(_) => ColumnType::Float64,
            ColumnData::Str(_) => ColumnType::Str,
        }
    }

    /// Number of allocated rows.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no rows are allocated.
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Borrow the value storage.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Whether the value at `idx` is non-null.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.get(idx).map(|b| *b).unwrap_or(false)
    }

    /// Number of nulls among the first `nrows` rows.
    pub fn null_count(&self, nrows: usize) -> usize {
        let n = nrows.min(self.validity.len());
        n - self.validity[..n].count_ones()
    }

    /// Grow or shrink to exactly `n` rows. New rows are null.
    pub fn resize(&mut self, n: usize) {
        self.data.resize(n);
        self.validity.resize(n, false);
    }

    /// Convert the column in place to a wider type on the ladder.
    ///
    /// Widening is value-preserving: integers become the equal float or the
    /// decimal rendering; floats render with `{}` formatting. Narrowing
    /// requests are ignored.
    pub fn promote(&mut self, to: ColumnType) {
        if to <= self.column_type() {
            return;
        }
        let old = std::mem::replace(&mut self.data, ColumnData::Int64(Vec::new()));
        self.data = old.widen(to, &self.validity);
    }

    /// Store an integer at `idx`, marking it valid.
    pub fn set_i64(&mut self, idx: usize, value: i64) {
        match &mut self.data {
            ColumnData::Int64(v) => v[idx] = value,
            ColumnData::Float64(v) => v[idx] = value as f64,
            ColumnData::Str(v) => v[idx] = value.to_string(),
        }
        self.validity.set(idx, true);
    }

    /// Store a float at `idx`, marking it valid. The column must already be
    /// `Float64` or wider.
    pub fn set_f64(&mut self, idx: usize, value: f64) {
        match &mut self.data {
            ColumnData::Int64(_) => unreachable!("float write into int column"),
            ColumnData::Float64(v) => v[idx] = value,
            ColumnData::Str(v) => v[idx] = value.to_string(),
        }
        self.validity.set(idx, true);
    }

    /// Store a string at `idx`, marking it valid. The column must already
    /// be `Str`.
    pub fn set_str(&mut self, idx: usize, value: String) {
        match &mut self.data {
            ColumnData::Str(v) => v[idx] = value,
            _ => unreachable!("string write into numeric column"),
        }
        self.validity.set(idx, true);
    }

    /// Mark the value at `idx` null.
    pub fn set_null(&mut self, idx: usize) {
        self.validity.set(idx, false);
    }
}
