//! File-level tests for the bulk, verify and export stages.

use dbexport::bulk::{self, BatchLimits, BulkConfig};
use dbexport::error::DbExportError;
use dbexport::export::{self, ExportConfig};
use dbexport::verify;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const THREE_ROWS: &str = "INSERT INTO t (a,b) VALUES (1,'x');\n\
INSERT INTO t (a,b) VALUES (2,'y');\n\
INSERT INTO t (a,b) VALUES (3,'z');\n";

fn bulk_config(input: &Path) -> BulkConfig {
    BulkConfig {
        input: input.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_bulk_run_writes_default_output_and_verifies() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();

    let report = bulk::run(&bulk_config(&input)).unwrap();

    let output = dir.path().join("t.sql.bulk");
    assert_eq!(report.output.as_deref(), Some(output.as_path()));
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "INSERT INTO t (a,b) VALUES\n(1,'x'),\n(2,'y'),\n(3,'z');\n"
    );

    let v = report.verification.unwrap();
    assert_eq!((v.original_rows, v.bulk_rows), (3, 3));
    assert!(!report.verification_failed());
    assert_eq!(report.statistics.rows, 3);
    assert_eq!(report.statistics.batches, 1);
}

#[test]
fn test_bulk_run_explicit_output_in_new_directory() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();
    let output = dir.path().join("nested/out.sql");

    let config = BulkConfig {
        output: Some(output.clone()),
        ..bulk_config(&input)
    };
    bulk::run(&config).unwrap();

    assert!(output.exists());
    assert!(!dir.path().join("t.sql.bulk").exists());
}

#[test]
fn test_bulk_run_replace_in_place() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();

    let config = BulkConfig {
        replace: true,
        ..bulk_config(&input)
    };
    let report = bulk::run(&config).unwrap();

    assert_eq!(report.output.as_deref(), Some(input.as_path()));
    assert!(fs::read_to_string(&input)
        .unwrap()
        .starts_with("INSERT INTO t (a,b) VALUES\n"));
    assert!(!dir.path().join("t.sql.bulk").exists());
    // original counts were taken before the replacement
    assert!(report.verification.unwrap().is_match());
}

#[test]
fn test_bulk_run_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();

    let config = BulkConfig {
        dry_run: true,
        ..bulk_config(&input)
    };
    let report = bulk::run(&config).unwrap();

    assert!(report.output.is_none());
    assert!(report.verification.is_none());
    assert_eq!(report.statistics.rows, 3);
    assert!(!dir.path().join("t.sql.bulk").exists());
}

#[test]
fn test_bulk_run_gzip_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&input).unwrap(), GzLevel::default());
    encoder.write_all(THREE_ROWS.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let report = bulk::run(&bulk_config(&input)).unwrap();

    let output = dir.path().join("t.sql.gz.bulk");
    assert!(fs::read_to_string(&output).unwrap().ends_with("(3,'z');\n"));
    assert!(report.verification.unwrap().is_match());
}

#[test]
fn test_bulk_run_line_too_long_aborts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    let long_value = "x".repeat(200);
    fs::write(
        &input,
        format!("INSERT INTO t (a) VALUES ('{}');\n", long_value),
    )
    .unwrap();

    let config = BulkConfig {
        max_line_bytes: 100,
        ..bulk_config(&input)
    };
    let err = bulk::run(&config).unwrap_err();
    assert!(matches!(err, DbExportError::LineTooLong { line: 1, limit: 100 }));
}

#[test]
fn test_bulk_run_missing_input() {
    let dir = TempDir::new().unwrap();
    let err = bulk::run(&bulk_config(&dir.path().join("missing.sql"))).unwrap_err();
    assert!(matches!(err, DbExportError::InputOpen { .. }));
}

#[test]
fn test_bulk_run_output_is_directory() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();

    let config = BulkConfig {
        output: Some(dir.path().to_path_buf()),
        ..bulk_config(&input)
    };
    let err = bulk::run(&config).unwrap_err();
    assert!(matches!(err, DbExportError::OutputCreate { .. }));
}

#[test]
fn test_bulk_run_refuses_output_equal_to_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();

    for output in [input.clone(), dir.path().join(".").join("t.sql")] {
        let config = BulkConfig {
            output: Some(output),
            ..bulk_config(&input)
        };
        let err = bulk::run(&config).unwrap_err();
        assert!(matches!(err, DbExportError::OutputCreate { .. }));
    }

    // the source is untouched
    assert_eq!(fs::read_to_string(&input).unwrap(), THREE_ROWS);
}

#[cfg(unix)]
#[test]
fn test_bulk_run_replace_keeps_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    fs::write(&input, THREE_ROWS).unwrap();
    fs::set_permissions(&input, fs::Permissions::from_mode(0o644)).unwrap();

    let config = BulkConfig {
        replace: true,
        ..bulk_config(&input)
    };
    bulk::run(&config).unwrap();

    let mode = fs::metadata(&input).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}

#[test]
fn test_bulk_run_chunked_output_verifies() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("t.sql");
    let content: String = (0..2500)
        .map(|i| format!("INSERT INTO t (a) VALUES ({});\n", i))
        .collect();
    fs::write(&input, content).unwrap();

    let config = BulkConfig {
        limits: BatchLimits::default(),
        ..bulk_config(&input)
    };
    let report = bulk::run(&config).unwrap();

    assert_eq!(report.statistics.batches, 3);
    let v = report.verification.unwrap();
    assert_eq!((v.original_rows, v.bulk_rows), (2500, 2500));
}

#[test]
fn test_verify_detects_lost_row() {
    let dir = TempDir::new().unwrap();
    let original = dir.path().join("t.sql");
    let bulk_file = dir.path().join("t.sql.bulk");
    fs::write(&original, THREE_ROWS).unwrap();
    fs::write(&bulk_file, "INSERT INTO t (a,b) VALUES\n(1,'x'),\n(3,'z');\n").unwrap();

    let v = verify::verify(&original, &bulk_file, 1024).unwrap();
    assert_eq!((v.original_rows, v.bulk_rows), (3, 2));

    let err = v.into_result().unwrap_err();
    assert_eq!(
        err.to_string(),
        "bulk verification failed: 3 rows in original, 2 rows in bulk output"
    );
}

#[test]
fn test_export_csv_to_inserts_and_bulk() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("users.csv");
    fs::write(
        &csv,
        "id,name,note\n1,alice,NULL\n2,\"Smith, Bob\",it's\n",
    )
    .unwrap();

    let config = ExportConfig {
        input: csv.clone(),
        table: "users".to_string(),
        bulk: true,
        ..Default::default()
    };
    let report = export::run(&config).unwrap();

    assert_eq!(report.rows, 2);
    let sql = dir.path().join("users.sql");
    assert_eq!(report.output, sql);
    assert_eq!(
        fs::read_to_string(&sql).unwrap(),
        "INSERT INTO users (id,name,note) VALUES ('1','alice',NULL);\n\
         INSERT INTO users (id,name,note) VALUES ('2','Smith, Bob','it\\'s');\n"
    );

    let bulk_report = report.bulk.unwrap();
    assert!(bulk_report.verification.unwrap().is_match());
    assert_eq!(
        fs::read_to_string(dir.path().join("users.sql.bulk")).unwrap(),
        "INSERT INTO users (id,name,note) VALUES\n\
         ('1','alice',NULL),\n\
         ('2','Smith, Bob','it\\'s');\n"
    );
}

#[test]
fn test_export_quoted_fields_and_embedded_newlines() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("notes.csv");
    fs::write(
        &csv,
        "id, note\n1,\"first\nsecond\"\n\n2,\"say \"\"hi\"\"\"\n",
    )
    .unwrap();

    let config = ExportConfig {
        input: csv,
        table: "notes".to_string(),
        ..Default::default()
    };
    let report = export::run(&config).unwrap();

    assert_eq!(report.rows, 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("notes.sql")).unwrap(),
        "INSERT INTO notes (id,note) VALUES ('1','first\\nsecond');\n\
         INSERT INTO notes (id,note) VALUES ('2','say \"hi\"');\n"
    );
}

#[test]
fn test_export_rejects_ragged_csv() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("bad.csv");
    fs::write(&csv, "id,name\n1,alice\n2\n").unwrap();

    let config = ExportConfig {
        input: csv,
        table: "t".to_string(),
        ..Default::default()
    };
    let err = export::run(&config).unwrap_err();
    assert!(matches!(
        err,
        DbExportError::CsvFieldCount {
            line: 3,
            expected: 2,
            found: 1
        }
    ));
}

#[test]
fn test_export_refuses_to_overwrite_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.sql");
    fs::write(&input, "id\n1\n").unwrap();

    let config = ExportConfig {
        input: input.clone(),
        table: "t".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        export::run(&config),
        Err(DbExportError::OutputCreate { .. })
    ));
    assert_eq!(fs::read_to_string(&input).unwrap(), "id\n1\n");
}
