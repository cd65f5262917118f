//! Row-count verification of a bulk conversion.
//!
//! Both files are re-read from disk independently of the conversion pass.
//! A data row is any non-empty line that is not a bare `INSERT INTO ...
//! VALUES` header: in the original file that is every statement line, in
//! the bulk file every tuple line plus any single-row statements.

use crate::bulk::classify::is_header_only;
use crate::error::{DbExportError, Result};
use crate::reader::LineReader;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub original_rows: u64,
    pub bulk_rows: u64,
}

impl Verification {
    pub fn is_match(&self) -> bool {
        self.original_rows == self.bulk_rows
    }

    /// `VerificationMismatch` when the counts differ.
    pub fn into_result(self) -> Result<Self> {
        if self.is_match() {
            Ok(self)
        } else {
            Err(DbExportError::VerificationMismatch {
                original_rows: self.original_rows,
                bulk_rows: self.bulk_rows,
            })
        }
    }
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.is_match() { "ok" } else { "FAILED" };
        write!(
            f,
            "bulk verification {}: {} original rows, {} bulk rows",
            verdict, self.original_rows, self.bulk_rows
        )
    }
}

/// Count the data rows of a file.
pub fn count_data_rows(path: &Path, max_line_bytes: usize) -> Result<u64> {
    let mut reader = LineReader::open(path, max_line_bytes)?;
    let mut rows = 0u64;

    while let Some(line) = reader.read_line()? {
        if line.trim().is_empty() || is_header_only(&line) {
            continue;
        }
        rows += 1;
    }

    Ok(rows)
}

/// Compare the data rows of `original` against the rewritten `bulk` file.
pub fn verify(original: &Path, bulk: &Path, max_line_bytes: usize) -> Result<Verification> {
    let original_rows = count_data_rows(original, max_line_bytes)?;
    let bulk_rows = count_data_rows(bulk, max_line_bytes)?;

    tracing::debug!(
        original = %original.display(),
        bulk = %bulk.display(),
        original_rows,
        bulk_rows,
        "verified row counts"
    );

    Ok(Verification {
        original_rows,
        bulk_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_count_skips_headers_and_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.sql.bulk");
        fs::write(
            &path,
            "INSERT INTO t (a) VALUES\n(1),\n(2);\n\nINSERT INTO u (a) VALUES (3);\n",
        )
        .unwrap();

        assert_eq!(count_data_rows(&path, 1024).unwrap(), 3);
    }

    #[test]
    fn test_mismatch_is_reported() {
        let v = Verification {
            original_rows: 3,
            bulk_rows: 2,
        };
        assert!(!v.is_match());
        assert!(matches!(
            v.into_result(),
            Err(DbExportError::VerificationMismatch {
                original_rows: 3,
                bulk_rows: 2
            })
        ));
    }

    #[test]
    fn test_missing_file_is_input_open_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.sql");
        let err = count_data_rows(&missing, 1024).unwrap_err();
        assert!(matches!(err, DbExportError::InputOpen { .. }));
    }
}
