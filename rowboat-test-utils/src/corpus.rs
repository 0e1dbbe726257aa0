//! Deterministic CSV corpus generators
//!
//! Every generator is a pure function of its arguments so tests comparing
//! runs (sequential vs parallel, different thread counts) see identical
//! bytes.

use std::fmt::Write as _;

/// Headerless all-integer CSV: row `i` holds `i, i+1, ..., i+cols-1`.
pub fn numeric_csv(rows: usize, cols: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..rows {
        for j in 0..cols {
            if j > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}", i + j);
        }
        out.push('\n');
    }
    out.into_bytes()
}

/// CSV with a header and str/int/float columns, including periodic nulls
/// and quoted fields.
pub fn mixed_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("name,count,ratio\n");
    for i in 0..rows {
        if i % 17 == 0 {
            let _ = writeln!(out, "\"row, {i}\",{i},{}.5", i % 100);
        } else if i % 13 == 0 {
            let _ = writeln!(out, "row{i},,");
        } else {
            let _ = writeln!(out, "row{i},{i},{}.25", i % 100);
        }
    }
    out.into_bytes()
}

/// Headerless two-column CSV whose line lengths vary wildly, so uniform
/// byte chunks carry very different row counts.
pub fn variable_width_csv(rows: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..rows {
        // Every fourth row is ~20x longer than the rest.
        let pad = if i % 4 == 3 { 120 } else { 0 };
        let _ = writeln!(out, "{i},{:0>width$}", i % 10, width = pad + 1);
    }
    out.into_bytes()
}

/// Numeric CSV with one record of the wrong field count somewhere in the
/// middle, at a deterministic row.
pub fn ragged_csv(rows: usize, cols: usize, bad_row: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..rows {
        if i == bad_row {
            let _ = writeln!(out, "{i}");
            continue;
        }
        for j in 0..cols {
            if j > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}", i + j);
        }
        out.push('\n');
    }
    out.into_bytes()
}
