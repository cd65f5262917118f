//! Export of query results (CSV) to single-row INSERT statements.
//!
//! The CSV header row becomes the column list, every following record one
//! `INSERT INTO <table> (<cols>) VALUES (...);` line. The resulting file is
//! exactly the shape the bulk pass expects, and can be compacted right away.

use crate::bulk::{self, BatchLimits, BulkConfig, BulkReport};
use crate::error::{DbExportError, Result};
use crate::reader::{Compression, DEFAULT_MAX_LINE_BYTES};
use csv::{ReaderBuilder, StringRecord, Trim};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

static FROM_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bFROM\s+([^\s;,()]+)").unwrap());

static SELECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bSELECT\b").unwrap());

/// Configuration for the export command
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// CSV file with a header row, optionally compressed
    pub input: PathBuf,
    /// SQL output (None for the input path with a `.sql` extension)
    pub output: Option<PathBuf>,
    /// Target table of the INSERT statements
    pub table: String,
    /// Longest accepted CSV record, in bytes of field data
    pub max_line_bytes: usize,
    /// Compact the SQL output into bulk inserts afterwards
    pub bulk: bool,
    pub limits: BatchLimits,
    pub verify: bool,
    pub progress: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            table: String::new(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            bulk: false,
            limits: BatchLimits::default(),
            verify: true,
            progress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub table: String,
    pub rows: u64,
    pub bulk: Option<BulkReport>,
}

/// Table name of the first `FROM` clause, case preserved.
pub fn table_name_from_query(query: &str) -> Option<String> {
    FROM_TABLE_RE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn is_select_query(query: &str) -> bool {
    SELECT_RE.is_match(query)
}

/// Render one CSV field as a SQL literal.
///
/// `NULL` and `(NULL)` (any case) stay bare, everything else is quoted with
/// `'` escaped as `\'`. Line breaks inside a field are written as `\n` and
/// `\r` so every statement stays on one line.
pub fn format_value(field: &str) -> String {
    let value = field
        .trim_matches(' ')
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    let upper = value.to_uppercase();
    if upper == "NULL" || upper == "(NULL)" {
        "NULL".to_string()
    } else {
        format!("'{}'", value)
    }
}

pub fn insert_statement(table: &str, columns: &[String], record: &StringRecord) -> String {
    let values: Vec<String> = record.iter().map(format_value).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        columns.join(","),
        values.join(",")
    )
}

/// `data.csv` → `data.sql`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("sql")
}

pub fn run(config: &ExportConfig) -> Result<ExportReport> {
    let output = config
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&config.input));
    if bulk::is_same_file(&output, &config.input) {
        return Err(DbExportError::OutputCreate {
            path: output,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output would overwrite the input file",
            ),
        });
    }

    let open_error = |source| DbExportError::InputOpen {
        path: config.input.clone(),
        source,
    };
    let file = File::open(&config.input).map_err(open_error)?;
    let raw = Compression::from_path(&config.input)
        .wrap_reader(Box::new(file))
        .map_err(open_error)?;

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(raw);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let file = File::create(&output).map_err(|source| DbExportError::OutputCreate {
        path: output.clone(),
        source,
    })?;
    let mut writer = BufWriter::with_capacity(bulk::WRITER_BUFFER_SIZE, file);

    let mut rows = 0u64;
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        if record.as_slice().len() > config.max_line_bytes {
            return Err(DbExportError::LineTooLong {
                line: record.position().map_or(0, |pos| pos.line()),
                limit: config.max_line_bytes,
            });
        }
        writeln!(writer, "{}", insert_statement(&config.table, &columns, &record))?;
        rows += 1;
    }

    writer.flush()?;
    drop(writer);
    drop(reader);

    tracing::info!(
        input = %config.input.display(),
        output = %output.display(),
        rows,
        "exported INSERT statements"
    );

    let bulk = if config.bulk {
        Some(bulk::run(&BulkConfig {
            input: output.clone(),
            output: None,
            replace: false,
            limits: config.limits,
            max_line_bytes: config.max_line_bytes,
            verify: config.verify,
            dry_run: false,
            progress: config.progress,
        })?)
    } else {
        None
    };

    Ok(ExportReport {
        input: config.input.clone(),
        output,
        table: config.table.clone(),
        rows,
        bulk,
    })
}
