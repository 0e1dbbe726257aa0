//! Rowboat Table - Columnar storage for the delimited-text reader
//!
//! This crate owns the output side of a read:
//!
//! - Typed columns with validity bitmaps
//! - The output table with grow/shrink row management
//! - Chunk-local row buffers with type-ladder inference
//! - The Int64 < Float64 < Str promotion lattice

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod column;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use buffer::{BufferColumn, RowBuffer};
pub use column::{Column, ColumnData};
pub use table::Table;
pub use types::ColumnType;
