//! Input sampling
//!
//! Before the parallel loop starts, a bounded prefix of the input is
//! examined to settle everything the driver needs up front: the separator,
//! whether the first record is a header, column names, seed types, and the
//! mean line length that drives the chunking plan. All decisions here are
//! estimates except the header offset; the type ladder absorbs seed types
//! that turn out too narrow.

use memchr::{memchr, memrchr};

use rowboat_core::{Dialect, HeaderMode, Limits, ReadError, Result};
use rowboat_table::types::{parse_f64, ColumnType};

use crate::parser::split_record;

/// How much of the input the sniffer may examine.
const SAMPLE_BYTES: usize = 64 * 1024;

/// How many sample records participate in separator and type detection.
const DETECT_RECORDS: usize = 128;

/// Separator candidates, in preference order on ties.
const SEPARATORS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Everything learned from the input prefix.
#[derive(Debug, Clone)]
pub struct Sniff {
    /// Detected or caller-pinned dialect.
    pub dialect: Dialect,
    /// Whether the first record was taken as a header.
    pub has_header: bool,
    /// Column names, from the header or synthesized as `c0`, `c1`, ...
    pub names: Vec<String>,
    /// Seed column types from the sampled records.
    pub types: Vec<ColumnType>,
    /// Absolute byte offset of the first data record.
    pub data_start: usize,
    /// Estimated mean record length in bytes, at least 1.0.
    pub mean_line_len: f64,
}

impl Sniff {
    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.names.len()
    }
}

/// Examine the input prefix and settle the read-time parameters.
pub fn sniff(
    input: &[u8],
    dialect: Option<Dialect>,
    header: HeaderMode,
    limits: &Limits,
) -> Result<Sniff> {
    if input.is_empty() {
        return Ok(Sniff {
            dialect: dialect.unwrap_or_default(),
            has_header: false,
            names: Vec::new(),
            types: Vec::new(),
            data_start: 0,
            mean_line_len: 1.0,
        });
    }

    let sample = sample_slice(input);
    let lines = sample_lines(sample);
    if lines.is_empty() {
        return Ok(Sniff {
            dialect: dialect.unwrap_or_default(),
            has_header: false,
            names: Vec::new(),
            types: Vec::new(),
            data_start: 0,
            mean_line_len: sample.len().max(1) as f64,
        });
    }

    let dialect = match dialect {
        Some(d) => d,
        None => Dialect::with_separator(detect_separator(&lines)),
    };

    let first = split_owned(lines[0].1, &dialect, limits)?;
    if first.len() > limits.max_columns {
        return Err(ReadError::LimitExceeded(format!(
            "{} columns exceeds max_columns ({})",
            first.len(),
            limits.max_columns
        )));
    }

    let second = lines
        .get(1)
        .map(|(_, line)| split_owned(line, &dialect, limits))
        .transpose()?;

    let has_header = match header {
        HeaderMode::Yes => true,
        HeaderMode::No => false,
        HeaderMode::Auto => looks_like_header(&first, second.as_deref()),
    };

    let (names, data_start, first_data_index) = if has_header {
        // The data region starts right after the header's terminator.
        let (offset, line) = lines[0];
        let after = input[offset + line.len()..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| offset + line.len() + i + 1)
            .unwrap_or(input.len());
        (first.clone(), after, 1)
    } else {
        let names = (0..first.len()).map(|i| format!("c{i}")).collect();
        (names, 0, 0)
    };

    let mut types = vec![ColumnType::NARROWEST; names.len()];
    for (_, line) in lines.iter().skip(first_data_index).take(DETECT_RECORDS) {
        let fields = split_owned(line, &dialect, limits)?;
        for (ty, field) in types.iter_mut().zip(fields.iter()) {
            if !field.is_empty() {
                *ty = ty.fit(field);
            }
        }
    }

    let mean_line_len = (sample.len() as f64 / lines.len() as f64).max(1.0);

    Ok(Sniff {
        dialect,
        has_header,
        names,
        types,
        data_start,
        mean_line_len,
    })
}

/// The sampled prefix, cut back to the last complete line when the input
/// continues past it.
fn sample_slice(input: &[u8]) -> &[u8] {
    if input.len() <= SAMPLE_BYTES {
        return input;
    }
    match memrchr(b'\n', &input[..SAMPLE_BYTES]) {
        Some(i) => &input[..i + 1],
        None => &input[..SAMPLE_BYTES],
    }
}

/// Non-empty sample lines with their absolute offsets, CR trimmed.
fn sample_lines(sample: &[u8]) -> Vec<(usize, &[u8])> {
    let mut lines = Vec::new();
    let mut pos = 0;
    while pos < sample.len() {
        let end = match memchr(b'\n', &sample[pos..]) {
            Some(i) => pos + i,
            None => sample.len(),
        };
        let mut content_end = end;
        if content_end > pos && sample[content_end - 1] == b'\r' {
            content_end -= 1;
        }
        if content_end > pos {
            lines.push((pos, &sample[pos..content_end]));
        }
        pos = end + 1;
    }
    lines
}

/// Pick the candidate separator with the most consistent nonzero per-line
/// count; ties break by higher count, then candidate order.
fn detect_separator(lines: &[(usize, &[u8])]) -> u8 {
    let probe = &lines[..lines.len().min(DETECT_RECORDS)];
    let mut best = (b',', 0usize, false);
    for &sep in &SEPARATORS {
        let counts: Vec<usize> = probe
            .iter()
            .map(|(_, line)| line.iter().filter(|&&b| b == sep).count())
            .collect();
        let first = counts[0];
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().all(|&c| c == first);
        let (_, best_count, best_consistent) = best;
        if (consistent && !best_consistent)
            || (consistent == best_consistent && first > best_count)
        {
            best = (sep, first, consistent);
        }
    }
    best.0
}

/// Header heuristic: every field of the first record is non-empty and
/// non-numeric, while the second record has at least one numeric field.
fn looks_like_header(first: &[String], second: Option<&[String]>) -> bool {
    let first_is_labels = !first.is_empty()
        && first
            .iter()
            .all(|f| !f.is_empty() && parse_f64(f).is_none());
    let second_has_numbers = second
        .map(|rec| rec.iter().any(|f| parse_f64(f).is_some()))
        .unwrap_or(false);
    first_is_labels && second_has_numbers
}

fn split_owned(line: &[u8], dialect: &Dialect, limits: &Limits) -> Result<Vec<String>> {
    split_record(line, dialect, limits.max_field_len)
        .map(|fields| fields.into_iter().map(|f| f.into_owned()).collect())
        .map_err(|message| ReadError::Parse { offset: 0, message })
}
