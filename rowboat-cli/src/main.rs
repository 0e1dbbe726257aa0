//! Rowboat CLI - Command-line tool for parallel delimited-text reading
//!
//! This binary provides command-line interfaces for:
//! - head: print the first rows of a file as an aligned table
//! - schema: show column names, types, and null counts
//! - stats: per-column summary statistics
//! - convert: re-emit the table as NDJSON

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rowboat_io::{
    read_path, Column, ColumnData, Dialect, HeaderMode, ProgressSink, RaggedMode, ReadOptions,
    ReadStatus, ReadSummary, Table,
};
use serde::Serialize;
use std::error::Error;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowboat")]
#[command(about = "Parallel delimited-text reader")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Worker threads (defaults to all available)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Stop after this many rows
    #[arg(long, global = true)]
    max_rows: Option<usize>,

    /// Field separator (a single character, or "tab")
    #[arg(long, global = true)]
    sep: Option<String>,

    /// Treat the first record as data, never as a header
    #[arg(long, global = true)]
    no_header: bool,

    /// Pad/truncate records with the wrong field count instead of failing
    #[arg(long, global = true)]
    permissive: bool,

    /// Show a progress bar while reading
    #[arg(long, global = true)]
    progress: bool,

    /// Enable diagnostic logging (respects RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first rows as an aligned table
    Head {
        /// Input file
        input: PathBuf,
        /// Rows to print
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,
    },
    /// Show column names, types, and null counts
    Schema {
        /// Input file
        input: PathBuf,
    },
    /// Per-column summary statistics
    Stats {
        /// Input file
        input: PathBuf,
        /// Emit statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-emit the table as NDJSON
    Convert {
        /// Input file
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Progress sink backed by an indicatif bar, scaled to permille.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(1000);
        bar.set_style(
            ProgressStyle::with_template("{wide_bar} {percent}% {msg}")
                .expect("valid progress template"),
        );
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, fraction: f64) -> bool {
        self.bar.set_position((fraction * 1000.0) as u64);
        true
    }

    fn finish(&self, fraction: f64, status: ReadStatus) {
        self.bar.set_position((fraction * 1000.0) as u64);
        match status {
            ReadStatus::Complete => self.bar.finish_with_message("done"),
            ReadStatus::Error => self.bar.abandon_with_message("failed"),
            ReadStatus::Interrupted => self.bar.abandon_with_message("interrupted"),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let options = build_options(&cli)?;
    let sink = if cli.progress {
        Some(BarProgress::new())
    } else {
        None
    };
    let progress = sink.as_ref().map(|s| s as &dyn ProgressSink);

    match cli.command {
        Commands::Head { ref input, rows } => {
            let summary = read_path(input, &options, progress)?;
            print_head(&summary.table, summary.nrows.min(rows));
        }
        Commands::Schema { ref input } => {
            let summary = read_path(input, &options, progress)?;
            print_schema(&summary);
        }
        Commands::Stats { ref input, json } => {
            let summary = read_path(input, &options, progress)?;
            let stats = column_stats(&summary.table, summary.nrows);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Commands::Convert { ref input, ref output } => {
            let summary = read_path(input, &options, progress)?;
            match output {
                Some(path) => {
                    let file = std::fs::File::create(path)?;
                    write_ndjson(&summary.table, summary.nrows, BufWriter::new(file))?;
                }
                None => {
                    let stdout = std::io::stdout();
                    write_ndjson(&summary.table, summary.nrows, BufWriter::new(stdout.lock()))?;
                }
            }
        }
    }
    Ok(())
}

fn build_options(cli: &Cli) -> Result<ReadOptions, Box<dyn Error>> {
    let dialect = match cli.sep.as_deref() {
        None => None,
        Some("tab") | Some("\\t") => Some(Dialect::with_separator(b'\t')),
        Some(s) if s.len() == 1 => Some(Dialect::with_separator(s.as_bytes()[0])),
        Some(s) => return Err(format!("invalid separator: {s:?}").into()),
    };

    Ok(ReadOptions {
        dialect,
        header: if cli.no_header {
            HeaderMode::No
        } else {
            HeaderMode::Auto
        },
        ragged: if cli.permissive {
            RaggedMode::Permissive
        } else {
            RaggedMode::Error
        },
        nthreads: cli.threads.unwrap_or(0),
        max_rows: cli.max_rows.unwrap_or(usize::MAX),
        ..ReadOptions::default()
    })
}

/// Render one cell for display; nulls print as empty.
fn cell_text(col: &Column, idx: usize) -> String {
    if !col.is_valid(idx) {
        return String::new();
    }
    match col.data() {
        ColumnData::Int64(v) => v[idx].to_string(),
        ColumnData::Float64(v) => v[idx].to_string(),
        ColumnData::Str(v) => v[idx].clone(),
    }
}

fn cell_json(col: &Column, idx: usize) -> serde_json::Value {
    if !col.is_valid(idx) {
        return serde_json::Value::Null;
    }
    match col.data() {
        ColumnData::Int64(v) => serde_json::Value::from(v[idx]),
        ColumnData::Float64(v) => serde_json::Value::from(v[idx]),
        ColumnData::Str(v) => serde_json::Value::from(v[idx].clone()),
    }
}

fn print_head(table: &Table, rows: usize) {
    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.name.len()).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows);
    for i in 0..rows {
        let row: Vec<String> = table
            .columns()
            .iter()
            .map(|col| cell_text(col, i))
            .collect();
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
        cells.push(row);
    }

    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(widths.iter())
        .map(|(c, &w)| format!("{:<w$}", c.name))
        .collect();
    println!("{}", header.join("  "));

    for row in cells {
        let line: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect();
        println!("{}", line.join("  "));
    }
}

fn print_schema(summary: &ReadSummary) {
    println!(
        "{} rows x {} columns ({} bytes, {} chunks, {} threads, {:.1?})",
        summary.nrows,
        summary.ncols,
        summary.bytes_read,
        summary.chunk_count,
        summary.nthreads,
        summary.wall_time,
    );
    for col in summary.table.columns() {
        println!(
            "  {}: {} ({} nulls)",
            col.name,
            col.column_type().name(),
            col.null_count(summary.nrows)
        );
    }
}

#[derive(Debug, Serialize)]
struct ColumnStats {
    name: String,
    dtype: &'static str,
    nulls: usize,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
}

/// Per-column statistics, computed column-parallel.
fn column_stats(table: &Table, nrows: usize) -> Vec<ColumnStats> {
    table
        .columns()
        .par_iter()
        .map(|col| {
            let nulls = col.null_count(nrows);
            let numeric: Option<Vec<f64>> = match col.data() {
                ColumnData::Int64(v) => Some(
                    v[..nrows]
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| col.is_valid(*i))
                        .map(|(_, x)| *x as f64)
                        .collect(),
                ),
                ColumnData::Float64(v) => Some(
                    v[..nrows]
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| col.is_valid(*i))
                        .map(|(_, x)| *x)
                        .collect(),
                ),
                ColumnData::Str(_) => None,
            };

            let (min, max, mean) = match numeric {
                Some(values) if !values.is_empty() => {
                    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    (Some(min), Some(max), Some(mean))
                }
                _ => (None, None, None),
            };

            ColumnStats {
                name: col.name.clone(),
                dtype: col.column_type().name(),
                nulls,
                min,
                max,
                mean,
            }
        })
        .collect()
}

fn print_stats(stats: &[ColumnStats]) {
    for s in stats {
        let fmt = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".into());
        println!(
            "{}: {} nulls={} min={} max={} mean={}",
            s.name,
            s.dtype,
            s.nulls,
            fmt(s.min),
            fmt(s.max),
            fmt(s.mean),
        );
    }
}

fn write_ndjson<W: Write>(table: &Table, nrows: usize, mut writer: W) -> Result<(), Box<dyn Error>> {
    for i in 0..nrows {
        let mut record = serde_json::Map::new();
        for col in table.columns() {
            record.insert(col.name.clone(), cell_json(col, i));
        }
        writeln!(writer, "{}", serde_json::Value::Object(record))?;
    }
    writer.flush()?;
    Ok(())
}
