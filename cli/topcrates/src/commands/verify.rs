//! `topcrates verify`: check mirror archives against the index checksums.

use std::path::Path;

use anyhow::{bail, Context, Result};

use topcrates_mirror::report::format_verify_report;
use topcrates_mirror::{verify_mirror, Config};

pub fn run(config: &Config, output: Option<&Path>) -> Result<()> {
    let root = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_dir());
    let report =
        verify_mirror(&root).with_context(|| format!("verifying mirror at {}", root.display()))?;
    print!("{}", format_verify_report(&report));

    if !report.is_ok() {
        bail!(
            "{} missing and {} corrupt archives in {}",
            report.missing.len(),
            report.corrupt.len(),
            root.display()
        );
    }
    Ok(())
}
