//! Local registry writer.
//!
//! Output layout, readable by Cargo's `local-registry` source:
//! ```text
//! <root>/
//!   index/se/rd/serde           one JSON line per mirrored version
//!   serde-1.0.193.crate
//! ```
//!
//! Writes are append-only. Existing index lines are never rewritten and
//! existing archives are never replaced, so a half-written mirror is a valid
//! starting point for the next run and an unchanged closure leaves the
//! directory byte-identical. A version is only indexed once its archive is
//! in place.

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use topcrates_index::{
    archive_file_name, index_path, FsIndex, IndexRecord, IndexSource, Package, Version,
};

use crate::cache::ArchiveCache;
use crate::closure::{Closure, PackageId};
use crate::error::{MirrorError, Result};
use crate::integrity::{verify_archive, Checksum};

/// Index subdirectory of a local registry.
pub const INDEX_DIR: &str = "index";

const PARTIAL_SUFFIX: &str = ".partial";

/// A version that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub package: PackageId,
    pub detail: String,
}

/// What a mirror write did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorReport {
    /// Versions whose index line was appended.
    pub indexed: Vec<PackageId>,
    /// Archives copied from the cache.
    pub copied: Vec<PackageId>,
    /// Archives already in the mirror.
    pub skipped: Vec<PackageId>,
    /// Versions whose archive is not in the cache.
    pub missing: Vec<PackageId>,
    pub failed: Vec<Failure>,
}

impl MirrorReport {
    /// Whether every version of the closure is in the mirror.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }

    fn fail(&mut self, package: PackageId, detail: String) {
        warn!(package = %package, "{detail}");
        self.failed.push(Failure { package, detail });
    }

    /// Write the missing versions as a JSON list of `{name, version}`.
    pub fn write_missing_list(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.missing)?;
        std::fs::write(path, json + "\n")
            .map_err(|e| MirrorError::fs(path, "writing missing list", e))
    }
}

enum Archive {
    Present,
    Copied,
    Missing,
}

/// Writes closures into a local registry directory.
#[derive(Debug, Clone)]
pub struct MirrorWriter {
    root: PathBuf,
    cache: ArchiveCache,
}

impl MirrorWriter {
    pub fn new(root: impl Into<PathBuf>, cache: ArchiveCache) -> Self {
        MirrorWriter {
            root: root.into(),
            cache,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR)
    }

    /// Add every version of the closure to the mirror.
    ///
    /// Only failing to create the output directory is an error; problems
    /// with individual packages land in the report.
    pub fn write(&self, closure: &Closure, index: &dyn IndexSource) -> Result<MirrorReport> {
        let index_dir = self.index_dir();
        std::fs::create_dir_all(&index_dir)
            .map_err(|e| MirrorError::fs(&index_dir, "creating mirror index", e))?;

        let mut report = MirrorReport::default();
        for (name, versions) in closure.by_name() {
            let ids: Vec<PackageId> = versions
                .into_iter()
                .map(|v| PackageId::new(name, v.clone()))
                .collect();
            let package = match index.package(name) {
                Ok(Some(package)) => package,
                Ok(None) => {
                    for id in ids {
                        report.fail(id, "not in the source index".to_string());
                    }
                    continue;
                }
                Err(e) => {
                    for id in ids {
                        report.fail(id, e.to_string());
                    }
                    continue;
                }
            };
            self.write_package(&package, ids, &mut report);
        }

        info!(
            indexed = report.indexed.len(),
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            missing = report.missing.len(),
            failed = report.failed.len(),
            "mirror written"
        );
        Ok(report)
    }

    fn write_package(&self, package: &Package, ids: Vec<PackageId>, report: &mut MirrorReport) {
        let path = match index_path(package.name()) {
            Ok(rel) => self.index_dir().join(rel),
            Err(e) => {
                for id in ids {
                    report.fail(id, e.to_string());
                }
                return;
            }
        };
        let (existing, needs_newline) = match read_indexed_versions(&path) {
            Ok(found) => found,
            Err(e) => {
                for id in ids {
                    report.fail(id, e.to_string());
                }
                return;
            }
        };

        let mut lines = Vec::new();
        let mut appended = Vec::new();
        for id in ids {
            let Some(record) = package.record(&id.version) else {
                report.fail(id, "version not in the source index".to_string());
                continue;
            };
            match self.ensure_archive(&id, record) {
                Ok(Archive::Present) => report.skipped.push(id.clone()),
                Ok(Archive::Copied) => report.copied.push(id.clone()),
                Ok(Archive::Missing) => {
                    warn!(package = %id, "archive not in cache");
                    report.missing.push(id);
                    continue;
                }
                Err(e) => {
                    report.fail(id, e.to_string());
                    continue;
                }
            }
            if existing.contains(&record.vers) {
                continue;
            }
            match record.line() {
                Ok(line) => {
                    lines.push(line.into_owned());
                    appended.push(id);
                }
                Err(e) => report.fail(id, e.to_string()),
            }
        }

        if lines.is_empty() {
            return;
        }
        match append_lines(&path, needs_newline, &lines) {
            Ok(()) => {
                debug!(package = %package.name(), lines = lines.len(), "index updated");
                report.indexed.extend(appended);
            }
            Err(e) => {
                let detail = e.to_string();
                for id in appended {
                    report.fail(id, detail.clone());
                }
            }
        }
    }

    fn ensure_archive(&self, id: &PackageId, record: &IndexRecord) -> Result<Archive> {
        let dest = self.root.join(archive_file_name(&id.name, &id.version));
        if dest.is_file() {
            return Ok(Archive::Present);
        }
        let Some(data) = self.cache.read(&id.name, &id.version)? else {
            return Ok(Archive::Missing);
        };
        verify_archive(&id.name, &record.vers, &record.cksum, &data)?;

        let mut partial = dest.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);
        std::fs::write(&partial, &data)
            .map_err(|e| MirrorError::fs(&partial, "writing archive", e))?;
        std::fs::rename(&partial, &dest).map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            MirrorError::fs(&dest, "moving archive into place", e)
        })?;
        debug!(package = %id, "archive copied");
        Ok(Archive::Copied)
    }
}

/// Versions already listed in an index file, and whether the file lacks a
/// final newline.
fn read_indexed_versions(path: &Path) -> Result<(BTreeSet<String>, bool)> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((BTreeSet::new(), false));
        }
        Err(e) => return Err(MirrorError::fs(path, "reading mirror index", e)),
    };
    let mut versions = BTreeSet::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record =
            IndexRecord::parse_line(line).map_err(|source| MirrorError::MalformedMirrorIndex {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })?;
        versions.insert(record.vers);
    }
    let needs_newline = !text.is_empty() && !text.ends_with('\n');
    Ok((versions, needs_newline))
}

fn append_lines(path: &Path, needs_newline: bool, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MirrorError::fs(parent, "creating index directory", e))?;
    }
    let mut text = String::new();
    if needs_newline {
        text.push('\n');
    }
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| MirrorError::fs(path, "opening mirror index", e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| MirrorError::fs(path, "appending to mirror index", e))
}

/// A corrupt mirror archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corruption {
    pub package: PackageId,
    pub expected: String,
    pub actual: String,
}

/// Result of checking a mirror.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// Archives whose checksum matches the index.
    pub verified: usize,
    /// Indexed versions without an archive.
    pub missing: Vec<PackageId>,
    pub corrupt: Vec<Corruption>,
    /// Archives and leftover partial files no index line refers to.
    pub orphans: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }
}

/// Check every indexed archive of a mirror against its checksum.
pub fn verify_mirror(root: &Path) -> Result<VerifyReport> {
    let index = FsIndex::open(root.join(INDEX_DIR))?;
    let mut report = VerifyReport::default();
    let mut referenced = BTreeSet::new();

    for name in index.package_names()? {
        let Some(package) = index.package(&name)? else {
            continue;
        };
        for record in package.records() {
            let Ok(version) = Version::parse(&record.vers) else {
                continue;
            };
            let id = PackageId::new(record.name.clone(), version);
            let file_name = archive_file_name(&id.name, &id.version);
            let path = root.join(&file_name);
            referenced.insert(file_name);
            if !path.is_file() {
                report.missing.push(id);
                continue;
            }
            let actual = Checksum::compute_file(&path)?;
            if record.cksum.is_empty() || actual.matches(&record.cksum) {
                report.verified += 1;
            } else {
                warn!(package = %id, "checksum mismatch");
                report.corrupt.push(Corruption {
                    package: id,
                    expected: record.cksum.clone(),
                    actual: actual.to_string(),
                });
            }
        }
    }

    let entries =
        std::fs::read_dir(root).map_err(|e| MirrorError::fs(root, "listing mirror", e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MirrorError::fs(root, "listing mirror", e))?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let is_archive = file_name.ends_with(".crate") || file_name.ends_with(PARTIAL_SUFFIX);
        if is_archive && !referenced.contains(&file_name) {
            report.orphans.push(entry.path());
        }
    }
    report.orphans.sort();

    info!(
        verified = report.verified,
        missing = report.missing.len(),
        corrupt = report.corrupt.len(),
        orphans = report.orphans.len(),
        "mirror verified"
    );
    Ok(report)
}

/// `.cargo/config.toml` snippet replacing crates.io with the mirror.
pub fn cargo_source_config(root: &Path) -> Result<String> {
    let mut local = toml::Table::new();
    local.insert(
        "local-registry".to_string(),
        toml::Value::String(root.display().to_string()),
    );
    let mut crates_io = toml::Table::new();
    crates_io.insert(
        "replace-with".to_string(),
        toml::Value::String("topcrates".to_string()),
    );

    let mut source = toml::Table::new();
    source.insert("crates-io".to_string(), toml::Value::Table(crates_io));
    source.insert("topcrates".to_string(), toml::Value::Table(local));
    let mut config = toml::Table::new();
    config.insert("source".to_string(), toml::Value::Table(source));

    Ok(toml::to_string(&config)?)
}
