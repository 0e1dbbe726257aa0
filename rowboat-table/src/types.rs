//! Column types and the promotion ladder
//!
//! Every column lives on a monotone ladder `Int64 < Float64 < Str`. A cell
//! that fails to parse at the column's current type promotes the column to
//! the narrowest type that accepts it. Promotion is a lattice join, so the
//! order in which chunks are flushed cannot change the final type.

/// Physical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnType {
    /// 64-bit signed integers.
    Int64,
    /// 64-bit floats.
    Float64,
    /// UTF-8 strings.
    Str,
}

impl ColumnType {
    /// The narrower of no types: where inference starts.
    pub const NARROWEST: ColumnType = ColumnType::Int64;

    /// Least upper bound of two types on the ladder.
    pub fn join(self, other: ColumnType) -> ColumnType {
        self.max(other)
    }

    /// The narrowest type that can represent `field`, starting the search
    /// at `self`. Empty fields are nulls and representable at any type.
    pub fn fit(self, field: &str) -> ColumnType {
        let mut ty = self;
        loop {
            let ok = match ty {
                ColumnType::Int64 => parse_i64(field).is_some(),
                ColumnType::Float64 => parse_f64(field).is_some(),
                ColumnType::Str => true,
            };
            if ok {
                return ty;
            }
            ty = match ty {
                ColumnType::Int64 => ColumnType::Float64,
                _ => ColumnType::Str,
            };
        }
    }

    /// Short lowercase name used in schema output.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Str => "str",
        }
    }
}

/// Parse a field as a 64-bit integer. Surrounding ASCII whitespace is
/// tolerated; empty input is not a number.
pub fn parse_i64(field: &str) -> Option<i64> {
    let s = field.trim_matches(|c: char| c == ' ' || c == '\t');
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Parse a field as a 64-bit float. Accepts everything `str::parse::<f64>`
/// accepts except the empty string.
pub fn parse_f64(field: &str) -> Option<f64> {
    let s = field.trim_matches(|c: char| c == ' ' || c == '\t');
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}
