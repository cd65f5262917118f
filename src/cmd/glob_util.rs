//! Glob pattern expansion for the bulk command.
//!
//! Expands patterns like `*.sql` or `exports/**/*.sql` into input files.
//! Previously written `.bulk` outputs are never picked up as inputs.

use crate::bulk::BULK_SUFFIX;
use std::path::{Path, PathBuf};

/// Check if a path string contains glob pattern characters.
pub fn is_glob_pattern(path: &str) -> bool {
    path.contains('*') || path.contains('?') || path.contains('[')
}

fn is_bulk_output(path: &Path) -> bool {
    path.to_string_lossy().ends_with(BULK_SUFFIX)
}

/// Expand a file path or glob pattern into a sorted list of input files.
///
/// # Errors
///
/// Returns an error if the pattern is invalid, nothing matches, or a
/// literal path doesn't exist.
pub fn expand_file_pattern(pattern: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern_str = pattern.to_string_lossy();

    if !is_glob_pattern(&pattern_str) {
        if !pattern.exists() {
            anyhow::bail!("file does not exist: {}", pattern.display());
        }
        return Ok(vec![pattern.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in glob::glob(&pattern_str)
        .map_err(|e| anyhow::anyhow!("invalid glob pattern '{}': {}", pattern_str, e))?
    {
        let path = entry
            .map_err(|e| anyhow::anyhow!("error reading path for pattern '{}': {}", pattern_str, e))?;
        if path.is_file() && !is_bulk_output(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        anyhow::bail!("no files match pattern: {}", pattern_str);
    }

    files.sort();
    Ok(files)
}

/// Outcome tally for multi-file runs.
#[derive(Debug, Default)]
pub struct MultiFileResult {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl MultiFileResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, path: PathBuf, error: String) {
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
