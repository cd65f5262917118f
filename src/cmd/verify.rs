//! Verify command CLI handler.

use crate::verify;
use anyhow::Context;
use std::path::PathBuf;

pub fn run(original: PathBuf, bulk: PathBuf, max_line_bytes: usize, json: bool) -> anyhow::Result<()> {
    let verification = verify::verify(&original, &bulk, max_line_bytes).with_context(|| {
        format!(
            "cannot verify {} against {}",
            bulk.display(),
            original.display()
        )
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verification)?);
    } else {
        eprintln!("{}", verification);
    }

    verification.into_result()?;
    Ok(())
}
