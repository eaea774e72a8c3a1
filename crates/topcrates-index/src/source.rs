//! Index sources and the filesystem / in-memory implementations.
//!
//! The `IndexSource` trait abstracts over where package metadata comes
//! from. `FsIndex` reads a crates.io-index checkout; `MemoryIndex` holds
//! synthetic packages for tests and embedding.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{IndexError, Result};
use crate::layout;
use crate::package::Package;
use crate::record::IndexRecord;

/// Read-only access to package metadata.
pub trait IndexSource {
    /// Fetch a package with all its versions, `None` if it is not indexed.
    fn package(&self, name: &str) -> Result<Option<Arc<Package>>>;

    /// Check whether a package is indexed.
    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.package(name)?.is_some())
    }
}

/// A crates.io-index checkout on disk.
///
/// Layout:
/// ```text
/// <root>/
///   config.json
///   1/a
///   3/s/syn
///   se/rd/serde
/// ```
/// Parsed files are memoized for the lifetime of the value.
#[derive(Debug)]
pub struct FsIndex {
    root: PathBuf,
    loaded: RefCell<HashMap<String, Option<Arc<Package>>>>,
}

impl FsIndex {
    /// Open an index rooted at `root`, which must be a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(IndexError::IndexNotFound { path: root });
        }
        Ok(FsIndex {
            root,
            loaded: RefCell::new(HashMap::new()),
        })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the index file for `name`.
    pub fn file_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(layout::index_path(name)?))
    }

    /// List the names of every package file under the root, sorted.
    ///
    /// Hidden entries (`.git`) and top-level files such as `config.json`
    /// are ignored.
    pub fn package_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }
            collect_files(&entry.path(), &mut names)?;
        }
        names.sort();
        Ok(names)
    }
}

fn collect_files(dir: &Path, names: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), names)?;
        } else if file_type.is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(())
}

impl IndexSource for FsIndex {
    fn package(&self, name: &str) -> Result<Option<Arc<Package>>> {
        let key = name.to_lowercase();
        if let Some(cached) = self.loaded.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let path = self.file_path(name)?;
        let package = if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            let package = Package::parse(name, &text)?;
            debug!(package = %name, versions = package.versions().count(), "loaded index file");
            Some(Arc::new(package))
        } else {
            None
        };

        self.loaded.borrow_mut().insert(key, package.clone());
        Ok(package)
    }
}

/// An index held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    packages: BTreeMap<String, Vec<IndexRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        MemoryIndex::default()
    }

    /// Add a version record to its package.
    pub fn insert(&mut self, record: IndexRecord) {
        self.packages
            .entry(record.name.to_lowercase())
            .or_default()
            .push(record);
    }

    /// Builder form of [`MemoryIndex::insert`].
    pub fn with(mut self, record: IndexRecord) -> Self {
        self.insert(record);
        self
    }

    /// Write the index out in crates.io layout under `root`.
    pub fn write_to(&self, root: &Path) -> Result<()> {
        for (name, records) in &self.packages {
            let path = root.join(layout::index_path(name)?);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut text = String::new();
            for record in records {
                text.push_str(&record.line()?);
                text.push('\n');
            }
            std::fs::write(&path, text)?;
        }
        Ok(())
    }
}

impl IndexSource for MemoryIndex {
    fn package(&self, name: &str) -> Result<Option<Arc<Package>>> {
        Ok(self.packages.get(&name.to_lowercase()).map(|records| {
            let display_name = records
                .first()
                .map(|r| r.name.clone())
                .unwrap_or_else(|| name.to_string());
            Arc::new(Package::from_records(display_name, records.clone()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryIndex {
        MemoryIndex::new()
            .with(IndexRecord::new("serde", "1.0.0").with_cksum("aa"))
            .with(IndexRecord::new("serde", "1.0.1").with_cksum("bb"))
            .with(IndexRecord::new("syn", "2.0.0").with_cksum("cc"))
            .with(IndexRecord::new("a", "0.1.0").with_cksum("dd"))
    }

    #[test]
    fn memory_lookup() {
        let index = sample();
        let serde = index.package("serde").unwrap().unwrap();
        assert_eq!(serde.versions().count(), 2);
        assert!(index.package("nope").unwrap().is_none());
        assert!(index.contains("syn").unwrap());
    }

    #[test]
    fn fs_index_reads_layout() {
        let dir = tempfile::tempdir().unwrap();
        sample().write_to(dir.path()).unwrap();
        assert!(dir.path().join("se/rd/serde").is_file());
        assert!(dir.path().join("3/s/syn").is_file());
        assert!(dir.path().join("1/a").is_file());

        let index = FsIndex::open(dir.path()).unwrap();
        let serde = index.package("serde").unwrap().unwrap();
        assert_eq!(serde.name(), "serde");
        assert_eq!(serde.versions().count(), 2);
        assert!(index.package("missing").unwrap().is_none());
    }

    #[test]
    fn fs_index_names_package_from_records() {
        let dir = tempfile::tempdir().unwrap();
        MemoryIndex::new()
            .with(IndexRecord::new("Inflector", "0.11.4"))
            .write_to(dir.path())
            .unwrap();
        assert!(dir.path().join("in/fl/inflector").is_file());

        let index = FsIndex::open(dir.path()).unwrap();
        let lower = index.package("inflector").unwrap().unwrap();
        assert_eq!(lower.name(), "Inflector");
        let exact = index.package("Inflector").unwrap().unwrap();
        assert_eq!(exact.name(), "Inflector");
        assert_eq!(index.package("INFLECTOR").unwrap().unwrap().name(), "Inflector");
    }

    #[test]
    fn fs_index_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        sample().write_to(dir.path()).unwrap();
        let index = FsIndex::open(dir.path()).unwrap();

        let first = index.package("syn").unwrap().unwrap();
        std::fs::remove_file(dir.path().join("3/s/syn")).unwrap();
        let second = index.package("syn").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn fs_index_lists_packages() {
        let dir = tempfile::tempdir().unwrap();
        sample().write_to(dir.path()).unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join(".git/objects/xx"), "").unwrap();

        let index = FsIndex::open(dir.path()).unwrap();
        assert_eq!(index.package_names().unwrap(), vec!["a", "serde", "syn"]);
    }

    #[test]
    fn open_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = FsIndex::open(dir.path().join("nope"));
        assert!(matches!(result, Err(IndexError::IndexNotFound { .. })));
    }

    #[test]
    fn invalid_name_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = FsIndex::open(dir.path()).unwrap();
        assert!(index.package("../x").is_err());
    }
}
