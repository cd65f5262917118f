//! Error kinds raised by the reader, bulk and export stages.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DbExportError {
    /// Source file cannot be opened
    InputOpen { path: PathBuf, source: io::Error },
    /// A line exceeds the configured maximum line size
    LineTooLong { line: u64, limit: usize },
    /// A line is not valid UTF-8
    InvalidEncoding { line: u64 },
    /// A CSV record has a different number of fields than the header
    CsvFieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    /// Destination file cannot be created
    OutputCreate { path: PathBuf, source: io::Error },
    /// Data row counts differ between the original and rewritten files
    VerificationMismatch { original_rows: u64, bulk_rows: u64 },
    /// Read or write failure after the file was opened
    Io(io::Error),
}

impl fmt::Display for DbExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbExportError::InputOpen { path, source } => {
                write!(f, "cannot open input file {}: {}", path.display(), source)
            }
            DbExportError::LineTooLong { line, limit } => {
                write!(
                    f,
                    "line {} exceeds the maximum line size of {} bytes",
                    line, limit
                )
            }
            DbExportError::InvalidEncoding { line } => {
                write!(f, "line {} is not valid UTF-8", line)
            }
            DbExportError::CsvFieldCount {
                line,
                expected,
                found,
            } => {
                write!(
                    f,
                    "CSV line {} has {} fields, expected {}",
                    line, found, expected
                )
            }
            DbExportError::OutputCreate { path, source } => {
                write!(f, "cannot create output file {}: {}", path.display(), source)
            }
            DbExportError::VerificationMismatch {
                original_rows,
                bulk_rows,
            } => {
                write!(
                    f,
                    "bulk verification failed: {} rows in original, {} rows in bulk output",
                    original_rows, bulk_rows
                )
            }
            DbExportError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DbExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbExportError::InputOpen { source, .. } => Some(source),
            DbExportError::OutputCreate { source, .. } => Some(source),
            DbExportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DbExportError {
    fn from(e: io::Error) -> Self {
        DbExportError::Io(e)
    }
}

impl From<csv::Error> for DbExportError {
    fn from(e: csv::Error) -> Self {
        let message = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(e) => DbExportError::Io(e),
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => DbExportError::CsvFieldCount {
                line: pos.map_or(0, |p| p.line()),
                expected: expected_len as usize,
                found: len as usize,
            },
            csv::ErrorKind::Utf8 { pos, .. } => DbExportError::InvalidEncoding {
                line: pos.map_or(0, |p| p.line()),
            },
            _ => DbExportError::Io(io::Error::new(io::ErrorKind::InvalidData, message)),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbExportError>;
