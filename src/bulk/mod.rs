//! Bulk-insert compaction of single-row INSERT files.
//!
//! Rewrites one-statement-per-row exports into multi-row statements:
//! - rows of a contiguous run share one `INSERT INTO ... VALUES` header
//! - batches close at a row or byte threshold, at non-INSERT lines and
//!   when the header text changes
//! - the result is re-read and row counts compared against the source

pub mod batcher;
pub mod classify;
pub mod rewrite;

pub use batcher::{BatchLimits, BatchStats, Batcher, DEFAULT_MAX_BYTES, DEFAULT_MAX_ROWS};

use crate::error::{DbExportError, Result};
use crate::reader::{LineReader, DEFAULT_MAX_LINE_BYTES};
use crate::verify::{self, Verification};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const WRITER_BUFFER_SIZE: usize = 256 * 1024;

/// Suffix appended to the input file name for the default output.
pub const BULK_SUFFIX: &str = ".bulk";

/// Configuration for one bulk conversion
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Single-row INSERT file
    pub input: PathBuf,
    /// Output file (None for `<input>.bulk`)
    pub output: Option<PathBuf>,
    /// Rewrite the input file in place
    pub replace: bool,
    pub limits: BatchLimits,
    pub max_line_bytes: usize,
    /// Re-read both files and compare row counts
    pub verify: bool,
    /// Dry run mode
    pub dry_run: bool,
    /// Show progress
    pub progress: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            replace: false,
            limits: BatchLimits::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            verify: true,
            dry_run: false,
            progress: false,
        }
    }
}

/// Result of a bulk conversion
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub input: PathBuf,
    /// Where the output ended up (None for dry runs)
    pub output: Option<PathBuf>,
    pub statistics: BatchStats,
    pub verification: Option<Verification>,
}

impl BulkReport {
    pub fn verification_failed(&self) -> bool {
        self.verification.is_some_and(|v| !v.is_match())
    }
}

/// Whether both paths name the same existing file.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `<input>.bulk` next to the input file.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(BULK_SUFFIX);
    PathBuf::from(name)
}

enum OutputTarget {
    Sink,
    File(PathBuf),
    /// Temp file in the input's directory, persisted over the input later
    Replace(NamedTempFile),
}

impl OutputTarget {
    fn prepare(config: &BulkConfig) -> Result<Self> {
        if config.dry_run {
            return Ok(OutputTarget::Sink);
        }
        if config.replace {
            let dir = match config.input.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let temp = NamedTempFile::new_in(&dir).map_err(|source| {
                DbExportError::OutputCreate { path: dir, source }
            })?;
            return Ok(OutputTarget::Replace(temp));
        }
        let path = config
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&config.input));
        // creating the output would truncate the input before it is read
        if is_same_file(&path, &config.input) {
            return Err(DbExportError::OutputCreate {
                path,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "output would overwrite the input file, use --replace instead",
                ),
            });
        }
        Ok(OutputTarget::File(path))
    }

    fn writer(&self) -> Result<Box<dyn Write>> {
        match self {
            OutputTarget::Sink => Ok(Box::new(std::io::sink())),
            OutputTarget::File(path) => {
                let create_error = |source| DbExportError::OutputCreate {
                    path: path.clone(),
                    source,
                };
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(create_error)?;
                    }
                }
                let file = File::create(path).map_err(create_error)?;
                Ok(Box::new(BufWriter::with_capacity(WRITER_BUFFER_SIZE, file)))
            }
            OutputTarget::Replace(temp) => {
                let file = temp.reopen().map_err(|source| DbExportError::OutputCreate {
                    path: temp.path().to_path_buf(),
                    source,
                })?;
                Ok(Box::new(BufWriter::with_capacity(WRITER_BUFFER_SIZE, file)))
            }
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Sink => None,
            OutputTarget::File(path) => Some(path),
            OutputTarget::Replace(temp) => Some(temp.path()),
        }
    }
}

fn new_progress_bar(file_size: u64) -> ProgressBar {
    let pb = ProgressBar::new(file_size);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▓▒░  ")
    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("Converting...");
    pb
}

/// Convert `config.input` into bulk statements and optionally verify.
pub fn run(config: &BulkConfig) -> Result<BulkReport> {
    let progress_bar = if config.progress {
        let file_size = std::fs::metadata(&config.input)
            .map(|m| m.len())
            .unwrap_or(0);
        Some(new_progress_bar(file_size))
    } else {
        None
    };

    let callback = progress_bar.clone().map(|pb| {
        Box::new(move |bytes: u64| pb.set_position(bytes)) as Box<dyn Fn(u64)>
    });
    let mut reader =
        LineReader::open_with_progress(&config.input, config.max_line_bytes, callback)?;

    let target = OutputTarget::prepare(config)?;
    let mut batcher = Batcher::new(target.writer()?, config.limits);

    while let Some(line) = reader.read_line()? {
        batcher.push_line(&line)?;
    }

    let (writer, statistics) = batcher.finish()?;
    drop(writer);
    drop(reader);

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    tracing::info!(
        input = %config.input.display(),
        rows = statistics.rows,
        batches = statistics.batches,
        "bulk conversion finished"
    );

    let verification = match target.path() {
        Some(written) if config.verify => Some(verify::verify(
            &config.input,
            written,
            config.max_line_bytes,
        )?),
        _ => None,
    };

    let output = match target {
        OutputTarget::Sink => None,
        OutputTarget::File(path) => Some(path),
        OutputTarget::Replace(temp) => {
            // never overwrite the source with output that lost rows
            let destination = if verification.is_some_and(|v| !v.is_match()) {
                let fallback = default_output_path(&config.input);
                tracing::warn!(
                    output = %fallback.display(),
                    "verification failed, keeping the original file"
                );
                fallback
            } else {
                config.input.clone()
            };
            let permissions = std::fs::metadata(&config.input)?.permissions();
            temp.as_file().set_permissions(permissions)?;
            temp.persist(&destination)
                .map_err(|e| DbExportError::Io(e.error))?;
            Some(destination)
        }
    };

    Ok(BulkReport {
        input: config.input.clone(),
        output,
        statistics,
        verification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("out/users.sql")),
            PathBuf::from("out/users.sql.bulk")
        );
    }

    #[test]
    fn test_is_same_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("t.sql");
        std::fs::write(&file, "").unwrap();

        assert!(is_same_file(&file, &dir.path().join("./t.sql")));
        assert!(!is_same_file(&file, &dir.path().join("t.sql.bulk")));
    }

    #[test]
    fn test_default_config() {
        let config = BulkConfig::default();
        assert_eq!(config.limits.max_rows, 1000);
        assert_eq!(config.limits.max_bytes, 3_900_000);
        assert_eq!(config.max_line_bytes, 102_400);
        assert!(config.verify);
    }
}
