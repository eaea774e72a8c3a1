//! Source archive cache.
//!
//! A flat directory of `.crate` archives, the layout of
//! `~/.cargo/registry/cache/<registry>/`:
//! ```text
//! <cache_root>/
//!   serde-1.0.193.crate
//!   syn-2.0.39.crate
//! ```

use std::path::{Path, PathBuf};

use topcrates_index::{archive_file_name, Version};

use crate::error::{MirrorError, Result};

/// Archives available for copying into a mirror.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArchiveCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_path(&self, name: &str, version: &Version) -> PathBuf {
        self.root.join(archive_file_name(name, version))
    }

    pub fn contains(&self, name: &str, version: &Version) -> bool {
        self.archive_path(name, version).is_file()
    }

    /// Read an archive, `None` if the cache lacks it.
    pub fn read(&self, name: &str, version: &Version) -> Result<Option<Vec<u8>>> {
        let path = self.archive_path(name, version);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MirrorError::fs(path, "reading archive", e)),
        }
    }

    /// Store an archive, replacing any previous copy.
    pub fn store(&self, name: &str, version: &Version, data: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| MirrorError::fs(&self.root, "creating cache dir", e))?;
        let path = self.archive_path(name, version);
        std::fs::write(&path, data).map_err(|e| MirrorError::fs(&path, "writing archive", e))?;
        Ok(path)
    }
}
