//! Packages and semantic-version resolution over their published versions.
//!
//! Wraps the `semver` crate. Resolution never considers yanked versions:
//! they stay in the index for history but are not candidates.

use semver::{Version, VersionReq};
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::record::IndexRecord;

/// Parse a version requirement string like `^1.0` or `>= 0.3, < 0.5`.
pub fn parse_requirement(s: &str) -> Result<VersionReq> {
    VersionReq::parse(s).map_err(|source| IndexError::InvalidRequirement {
        requirement: s.to_string(),
        source,
    })
}

/// A package and all of its published versions.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    versions: Vec<(Version, IndexRecord)>,
}

impl Package {
    /// Build a package from records, dropping those with unparseable versions.
    pub fn from_records(name: impl Into<String>, records: Vec<IndexRecord>) -> Self {
        let name = name.into();
        let mut versions = Vec::with_capacity(records.len());
        for record in records {
            match Version::parse(&record.vers) {
                Ok(version) => versions.push((version, record)),
                Err(e) => debug!(package = %name, vers = %record.vers, error = %e, "skipping unparseable version"),
            }
        }
        Package { name, versions }
    }

    /// Parse the content of an index file.
    ///
    /// The package is named after its records, which keep the published
    /// spelling; `name` is only used for an empty file.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut records = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record =
                IndexRecord::parse_line(line).map_err(|source| IndexError::MalformedRecord {
                    name: name.to_string(),
                    line: i + 1,
                    source,
                })?;
            records.push(record);
        }
        let name = records
            .first()
            .map(|r| r.name.clone())
            .unwrap_or_else(|| name.to_string());
        Ok(Package::from_records(name, records))
    }

    /// Package name as given by the index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All versions, in index (publication) order.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter().map(|(v, _)| v)
    }

    /// All records, in index order.
    pub fn records(&self) -> impl Iterator<Item = &IndexRecord> {
        self.versions.iter().map(|(_, r)| r)
    }

    /// Look up the record of an exact version.
    pub fn record(&self, version: &Version) -> Option<&IndexRecord> {
        self.versions
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, r)| r)
    }

    /// The "current" version: highest non-yanked version, pre-releases
    /// included.
    pub fn current(&self) -> Option<&Version> {
        self.available().max()
    }

    /// Highest non-yanked stable release.
    pub fn latest_stable(&self) -> Option<&Version> {
        self.available().filter(|v| v.pre.is_empty()).max()
    }

    /// Highest non-yanked version satisfying `req`.
    pub fn best_match(&self, req: &VersionReq) -> Option<&Version> {
        self.available().filter(|v| req.matches(v)).max()
    }

    fn available(&self) -> impl Iterator<Item = &Version> {
        self.versions
            .iter()
            .filter(|(_, r)| !r.yanked)
            .map(|(v, _)| v)
    }
}
