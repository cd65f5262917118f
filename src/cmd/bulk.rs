//! Bulk command CLI handler.

use super::glob_util::{expand_file_pattern, MultiFileResult};
use super::LimitArgs;
use crate::bulk::{self, BulkConfig, BulkReport};
use crate::config::Settings;
use crate::reader::Compression;
use std::path::PathBuf;
use std::time::Instant;

pub struct BulkArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub replace: bool,
    pub limits: LimitArgs,
    pub strict: bool,
    pub json: bool,
    pub progress: bool,
    pub dry_run: bool,
    pub fail_fast: bool,
}

pub fn run(args: BulkArgs) -> anyhow::Result<()> {
    let settings = Settings::load(args.limits.config.as_deref(), &args.limits.flags())?;
    let files = expand_file_pattern(&args.file)?;

    if files.len() > 1 && args.output.is_some() {
        anyhow::bail!(
            "--output cannot be used with a glob pattern; each file is written next to its input"
        );
    }

    let total = files.len();
    let mut result = MultiFileResult::new();
    let mut reports = Vec::new();

    for (idx, file) in files.into_iter().enumerate() {
        if total > 1 && !args.json {
            eprintln!("[{}/{}] Converting: {}", idx + 1, total, file.display());
        }

        match run_single(&args, &settings, file.clone()) {
            Ok(report) => {
                if !args.json {
                    print_report(&report, args.dry_run);
                }
                let failed = report.verification_failed();
                if failed {
                    result.record_failure(file, "bulk verification failed".to_string());
                } else {
                    result.record_success();
                }
                reports.push(report);
                if failed && args.strict && args.fail_fast {
                    break;
                }
            }
            Err(e) if total == 1 => return Err(e),
            Err(e) => {
                eprintln!("  Error: {:#}\n", e);
                result.record_failure(file, format!("{:#}", e));
                if args.fail_fast {
                    break;
                }
            }
        }
    }

    if args.json {
        if reports.len() == 1 {
            println!("{}", serde_json::to_string_pretty(&reports[0])?);
        } else {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    if total > 1 && !args.json {
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Bulk Summary:");
        eprintln!("  Total files: {}", total);
        eprintln!("  Succeeded: {}", result.succeeded);
        eprintln!("  Failed: {}", result.failed);
        if result.has_failures() {
            eprintln!();
            eprintln!("Failed files:");
            for (path, error) in &result.errors {
                eprintln!("  - {}: {}", path.display(), error);
            }
        }
    }

    let verification_failures = reports.iter().filter(|r| r.verification_failed()).count();
    let hard_failures = result.failed - verification_failures;

    if hard_failures > 0 {
        anyhow::bail!("{} of {} files failed", hard_failures, total);
    }
    if args.strict && verification_failures > 0 {
        anyhow::bail!(
            "Strict mode: bulk verification failed for {} file(s)",
            verification_failures
        );
    }

    Ok(())
}

fn run_single(args: &BulkArgs, settings: &Settings, file: PathBuf) -> anyhow::Result<BulkReport> {
    if args.replace && Compression::from_path(&file) != Compression::None {
        anyhow::bail!(
            "--replace cannot rewrite compressed input {}; write to --output instead",
            file.display()
        );
    }

    let config = BulkConfig {
        input: file,
        output: args.output.clone(),
        replace: args.replace,
        limits: settings.limits,
        max_line_bytes: settings.max_line_bytes,
        verify: settings.verify,
        dry_run: args.dry_run,
        progress: args.progress && !args.json,
    };

    let start_time = Instant::now();
    let report = bulk::run(&config)?;
    tracing::debug!(elapsed = ?start_time.elapsed(), "bulk pass done");

    Ok(report)
}

pub(super) fn print_report(report: &BulkReport, dry_run: bool) {
    let stats = &report.statistics;

    eprintln!();
    if dry_run {
        eprintln!("✓ Dry run completed (no output written)");
    } else if let Some(out) = &report.output {
        eprintln!("✓ Bulk conversion written to {}", out.display());
    }
    eprintln!("  Lines read: {}", stats.lines_read);
    eprintln!("  Data rows: {}", stats.rows);
    eprintln!("  Bulk statements: {}", stats.batches);
    eprintln!("  Pass-through lines: {}", stats.boundary_lines);
    eprintln!(
        "  Bytes processed: {:.2} MB",
        stats.bytes_read as f64 / (1024.0 * 1024.0)
    );

    if let Some(v) = &report.verification {
        if v.is_match() {
            eprintln!("✓ BulkSQL verification ok ({} = {} rows)", v.original_rows, v.bulk_rows);
        } else {
            eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            eprintln!(
                "✗ BulkSQL verification FAILED: {} rows in original, {} rows in bulk output",
                v.original_rows, v.bulk_rows
            );
            if let Some(out) = &report.output {
                eprintln!("  Output left in place for inspection: {}", out.display());
            }
            eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        }
    }
    eprintln!();
}
