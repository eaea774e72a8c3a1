//! `topcrates init`: write a starter configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use topcrates_mirror::Config;

pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "'{}' already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, Config::template()).with_context(|| format!("writing {}", path.display()))?;

    println!("Created {}", path.display());
    println!("  next: `topcrates update` to fetch the crates.io index");
    Ok(())
}
