//! `topcrates update`: clone or refresh the crates.io index with git.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use topcrates_mirror::Config;

pub fn run(config: &Config) -> Result<()> {
    let dir = config.index_dir();
    if dir.join(".git").exists() {
        println!("Updating {}", dir.display());
        git(&dir, &["fetch", "origin"])?;
        if let Err(e) = git(&dir, &["reset", "--hard", "origin/HEAD"]) {
            warn!(error = %e, "origin/HEAD not set, falling back to origin/master");
            git(&dir, &["reset", "--hard", "origin/master"])?;
        }
    } else {
        check_clone_target(&dir)?;
        let parent = match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
        println!("Cloning {} into {}", config.paths.index_url, dir.display());
        let dest = dir.to_string_lossy();
        git(parent, &["clone", &config.paths.index_url, &dest])?;
    }
    println!("Index ready at {}", dir.display());
    Ok(())
}

/// A clone needs a missing or empty directory.
fn check_clone_target(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let mut entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    if entries.next().is_some() {
        bail!(
            "{} exists but is not a git checkout; remove it or point `paths.index` elsewhere",
            dir.display()
        );
    }
    Ok(())
}

fn git(dir: &Path, args: &[&str]) -> Result<()> {
    info!(dir = %dir.display(), "git {}", args.join(" "));
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .context("running git (is it installed?)")?;
    if !status.success() {
        bail!("git {} failed with {status}", args.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_non_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("crates.io-index");
        std::fs::create_dir_all(&index).unwrap();
        std::fs::write(index.join("stray"), "x").unwrap();

        let err = check_clone_target(&index).unwrap_err();
        assert!(err.to_string().contains("not a git checkout"));
    }

    #[test]
    fn empty_or_absent_directory_can_be_cloned_into() {
        let dir = tempfile::tempdir().unwrap();
        check_clone_target(&dir.path().join("absent")).unwrap();
        check_clone_target(dir.path()).unwrap();
    }
}
