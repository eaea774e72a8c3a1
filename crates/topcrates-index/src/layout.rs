//! crates.io index directory layout.
//!
//! Index files are sharded by name length and prefix:
//! ```text
//! 1/a
//! 2/ab
//! 3/a/abc
//! ab/cd/abcd
//! se/rd/serde
//! ```
//! Paths are always lowercase, whatever the case of the published name.

use crate::error::{IndexError, Result};

/// Compute the relative index path for a package name.
pub fn index_path(name: &str) -> Result<String> {
    validate_name(name)?;

    let name = name.to_lowercase();
    let path = match name.len() {
        1 => format!("1/{name}"),
        2 => format!("2/{name}"),
        3 => format!("3/{}/{name}", &name[..1]),
        _ => format!("{}/{}/{name}", &name[..2], &name[2..4]),
    };
    Ok(path)
}

/// Check that a name can be a crates.io package name.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, which also keeps
/// the byte slicing in [`index_path`] on character boundaries.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(IndexError::InvalidName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(IndexError::InvalidName {
            name: name.to_string(),
            reason: format!("unexpected character {c:?}"),
        });
    }

    Ok(())
}

/// File name of a package archive, as stored in caches and local registries.
pub fn archive_file_name(name: &str, version: &semver::Version) -> String {
    format!("{name}-{version}.crate")
}
