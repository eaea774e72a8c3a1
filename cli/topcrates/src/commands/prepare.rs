//! `topcrates prepare`: select, resolve and write the mirror.

use std::path::PathBuf;

use anyhow::{Context, Result};

use topcrates_index::FsIndex;
use topcrates_mirror::report::{format_mirror_report, format_omissions};
use topcrates_mirror::{cargo_source_config, plan, ArchiveCache, Config, Filters, MirrorReport, MirrorWriter};

/// Command-line overrides of the configured locations.
#[derive(Debug, Clone, Default)]
pub struct PrepareArgs {
    pub output: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub missing: Option<PathBuf>,
}

pub fn run(config: &Config, filters: &Filters, args: &PrepareArgs) -> Result<()> {
    let report = prepare(config, filters, args)?;
    if report.is_complete() {
        let output = args.output.clone().unwrap_or_else(|| config.output_dir());
        println!("\nTo build against the mirror, add to .cargo/config.toml:\n");
        print!("{}", cargo_source_config(&output)?);
    }
    Ok(())
}

pub(crate) fn prepare(config: &Config, filters: &Filters, args: &PrepareArgs) -> Result<MirrorReport> {
    let index_dir = config.index_dir();
    let index = FsIndex::open(&index_dir).with_context(|| {
        format!(
            "opening index at {} (run `topcrates update` first)",
            index_dir.display()
        )
    })?;

    let plan = plan(config, filters, &index)?;
    for warning in &plan.selection.warnings {
        println!("warning: {warning}");
    }
    println!(
        "Selected {} packages; closure has {} versions",
        plan.selection.len(),
        plan.closure.len()
    );
    print!("{}", format_omissions(&plan.closure.omissions));

    let output = args.output.clone().unwrap_or_else(|| config.output_dir());
    let cache = ArchiveCache::new(args.cache.clone().unwrap_or_else(|| config.cache_dir()));
    let writer = MirrorWriter::new(&output, cache);
    let report = writer
        .write(&plan.closure, &index)
        .with_context(|| format!("writing mirror at {}", output.display()))?;
    print!("{}", format_mirror_report(&report));

    if let Some(path) = &args.missing {
        report.write_missing_list(path)?;
        println!(
            "Wrote {} missing versions to {}",
            report.missing.len(),
            path.display()
        );
    }
    Ok(report)
}
