//! Export command CLI handler.

use super::LimitArgs;
use crate::config::Settings;
use crate::export::{self, ExportConfig};
use std::path::PathBuf;

pub struct ExportArgs {
    pub file: PathBuf,
    pub table: Option<String>,
    pub query: Option<String>,
    pub output: Option<PathBuf>,
    pub bulk: bool,
    pub limits: LimitArgs,
    pub strict: bool,
    pub json: bool,
    pub progress: bool,
}

fn resolve_table(table: Option<String>, query: Option<&str>) -> anyhow::Result<String> {
    if let Some(table) = table {
        return Ok(table);
    }
    let query = query.unwrap_or_default();
    if !export::is_select_query(query) {
        anyhow::bail!("SELECT statement must exist in the query: {}", query);
    }
    export::table_name_from_query(query).ok_or_else(|| {
        anyhow::anyhow!(
            "cannot determine the table name from query '{}'; use --table",
            query
        )
    })
}

pub fn run(args: ExportArgs) -> anyhow::Result<()> {
    let settings = Settings::load(args.limits.config.as_deref(), &args.limits.flags())?;
    let table = resolve_table(args.table, args.query.as_deref())?;

    if !args.file.exists() {
        anyhow::bail!("input file does not exist: {}", args.file.display());
    }

    let config = ExportConfig {
        input: args.file,
        output: args.output,
        table,
        max_line_bytes: settings.max_line_bytes,
        bulk: args.bulk,
        limits: settings.limits,
        verify: settings.verify,
        progress: args.progress && !args.json,
    };

    let report = export::run(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "✓ Exported {} rows of table {} to {}",
            report.rows,
            report.table,
            report.output.display()
        );
        if let Some(bulk) = &report.bulk {
            super::bulk::print_report(bulk, false);
        }
    }

    if args.strict && report.bulk.as_ref().is_some_and(|b| b.verification_failed()) {
        anyhow::bail!("Strict mode: bulk verification failed");
    }

    Ok(())
}
