//! Streaming batch state machine.
//!
//! Rows are written one step behind: the most recent row stays pending so
//! its separator can still become `;` when the batch closes. The header line
//! is only written once a batch holds a second row; a batch that closes with
//! a single row is written back as the original one-line statement. A bare
//! header therefore never reaches the output.

use super::classify::{classify, LineKind};
use super::rewrite::{fix_terminator, rewrite_row};
use serde::Serialize;
use std::io::{self, Write};

/// Row-count limit per batch.
pub const DEFAULT_MAX_ROWS: usize = 1000;
/// Byte limit per batch, kept under a 4 MB statement ceiling.
pub const DEFAULT_MAX_BYTES: usize = 3_900_000;

/// Thresholds that close a batch mid-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchLimits {
    pub max_rows: usize,
    /// Cumulative input line bytes
    pub max_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Counters for one bulk pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub lines_read: u64,
    pub rows: u64,
    pub batches: u64,
    pub boundary_lines: u64,
    pub bytes_read: u64,
}

#[derive(Debug)]
struct OpenBatch {
    header: String,
    /// Last appended row, still ending with `,`
    pending: String,
    rows: usize,
    bytes: usize,
}

#[derive(Debug)]
enum BatchState {
    Closed,
    Open(OpenBatch),
}

pub struct Batcher<W: Write> {
    out: W,
    limits: BatchLimits,
    state: BatchState,
    stats: BatchStats,
}

impl<W: Write> Batcher<W> {
    pub fn new(out: W, limits: BatchLimits) -> Self {
        Self {
            out,
            limits,
            state: BatchState::Closed,
            stats: BatchStats::default(),
        }
    }

    /// Feed one input line (without its newline).
    pub fn push_line(&mut self, line: &str) -> io::Result<()> {
        self.stats.lines_read += 1;
        self.stats.bytes_read += line.len() as u64;

        match classify(line) {
            LineKind::StatementStart { header, values } => {
                self.push_row(header, values, line.len())
            }
            LineKind::Boundary => {
                self.close_batch()?;
                self.stats.boundary_lines += 1;
                writeln!(self.out, "{}", line)
            }
        }
    }

    fn push_row(&mut self, header: &str, values: &str, line_len: usize) -> io::Result<()> {
        let must_close = match &self.state {
            BatchState::Open(batch) => {
                batch.header != header
                    || batch.rows >= self.limits.max_rows
                    || batch.bytes >= self.limits.max_bytes
            }
            BatchState::Closed => false,
        };
        if must_close {
            self.close_batch()?;
        }

        let row = rewrite_row(values);
        self.stats.rows += 1;

        match &mut self.state {
            BatchState::Open(batch) => {
                if batch.rows == 1 {
                    writeln!(self.out, "{}", batch.header)?;
                }
                let previous = std::mem::replace(&mut batch.pending, row);
                writeln!(self.out, "{}", previous)?;
                batch.rows += 1;
                batch.bytes += line_len;
            }
            BatchState::Closed => {
                tracing::trace!(header, "opening batch");
                self.stats.batches += 1;
                self.state = BatchState::Open(OpenBatch {
                    header: header.to_string(),
                    pending: row,
                    rows: 1,
                    bytes: line_len,
                });
            }
        }
        Ok(())
    }

    /// Close the open batch, if any, terminating its last row with `;`.
    ///
    /// Shared by threshold splits, boundary lines and end of input.
    pub fn close_batch(&mut self) -> io::Result<()> {
        let BatchState::Open(batch) = std::mem::replace(&mut self.state, BatchState::Closed)
        else {
            return Ok(());
        };

        tracing::trace!(rows = batch.rows, bytes = batch.bytes, "closing batch");

        let last = fix_terminator(&batch.pending);
        if batch.rows == 1 {
            writeln!(self.out, "{} {}", batch.header, last)
        } else {
            writeln!(self.out, "{}", last)
        }
    }

    /// Close any open batch, flush, and hand back the sink.
    pub fn finish(mut self) -> io::Result<(W, BatchStats)> {
        self.close_batch()?;
        self.out.flush()?;
        Ok((self.out, self.stats))
    }
}
