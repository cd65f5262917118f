mod bulk;
mod export;
mod glob_util;
mod verify;

use crate::config::BulkSection;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbexport")]
#[command(version)]
#[command(
    about = "Turn exported query results into INSERT statements and compact them into bulk inserts",
    long_about = None
)]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Batch limits and config file shared by the converting commands
#[derive(Args, Debug, Clone, Default)]
pub struct LimitArgs {
    /// YAML config file with a `bulk:` section
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum rows per bulk INSERT statement [default: 1000]
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Maximum input bytes per bulk INSERT statement [default: 3900000]
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Maximum accepted line length in bytes [default: 102400]
    #[arg(long)]
    pub max_line_bytes: Option<usize>,

    /// Skip the row-count verification after conversion
    #[arg(long)]
    pub no_verify: bool,
}

impl LimitArgs {
    fn flags(&self) -> BulkSection {
        BulkSection {
            max_rows: self.max_rows,
            max_bytes: self.max_bytes,
            max_line_bytes: self.max_line_bytes,
            verify: if self.no_verify { Some(false) } else { None },
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compact single-row INSERT statements into multi-row bulk inserts
    Bulk {
        /// Input SQL file or glob pattern (e.g., *.sql, dumps/**/*.sql)
        /// Supports .gz, .bz2, .xz, .zst compression
        file: PathBuf,

        /// Output file [default: <FILE>.bulk]
        #[arg(short, long, conflicts_with = "replace")]
        output: Option<PathBuf>,

        /// Rewrite the input file in place (kept if verification fails)
        #[arg(long)]
        replace: bool,

        #[command(flatten)]
        limits: LimitArgs,

        /// Exit with an error when verification fails
        #[arg(long)]
        strict: bool,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Show progress during conversion
        #[arg(short, long)]
        progress: bool,

        /// Preview without writing files (dry run)
        #[arg(long)]
        dry_run: bool,

        /// Stop on first file that fails (for glob patterns)
        #[arg(long)]
        fail_fast: bool,
    },

    /// Compare data row counts of a single-row file and its bulk version
    Verify {
        /// Original single-row INSERT file
        original: PathBuf,

        /// Bulk INSERT file
        bulk: PathBuf,

        /// Maximum accepted line length in bytes
        #[arg(long, default_value_t = crate::reader::DEFAULT_MAX_LINE_BYTES)]
        max_line_bytes: usize,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Convert a CSV export into INSERT statements
    Export {
        /// CSV file whose first row holds the column names
        file: PathBuf,

        /// Target table name
        #[arg(short, long, required_unless_present = "query", conflicts_with = "query")]
        table: Option<String>,

        /// SELECT query the CSV came from (the table is taken from its FROM clause)
        #[arg(short, long)]
        query: Option<String>,

        /// Output SQL file [default: <FILE> with .sql extension]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write compacted bulk inserts to <OUTPUT>.bulk
        #[arg(long)]
        bulk: bool,

        #[command(flatten)]
        limits: LimitArgs,

        /// Exit with an error when verification fails
        #[arg(long)]
        strict: bool,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Show progress during conversion
        #[arg(short, long)]
        progress: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Bulk {
            file,
            output,
            replace,
            limits,
            strict,
            json,
            progress,
            dry_run,
            fail_fast,
        } => bulk::run(bulk::BulkArgs {
            file,
            output,
            replace,
            limits,
            strict,
            json,
            progress,
            dry_run,
            fail_fast,
        }),
        Commands::Verify {
            original,
            bulk,
            max_line_bytes,
            json,
        } => verify::run(original, bulk, max_line_bytes, json),
        Commands::Export {
            file,
            table,
            query,
            output,
            bulk,
            limits,
            strict,
            json,
            progress,
        } => export::run(export::ExportArgs {
            file,
            table,
            query,
            output,
            bulk,
            limits,
            strict,
            json,
            progress,
        }),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "dbexport", &mut io::stdout());
            Ok(())
        }
    }
}
