//! Version records as stored in crates.io index files.
//!
//! Each index file holds one JSON object per line, one line per published
//! version. The raw line is kept next to the parsed record so that mirrors
//! can reproduce it byte for byte.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// The kind of a dependency edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepKind {
    /// Regular dependency, needed to build and run the package.
    #[default]
    Normal,
    /// Build-script dependency.
    Build,
    /// Only needed for tests, examples and benchmarks.
    Dev,
}

/// A declared dependency of one published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDependency {
    /// Name the dependent uses for the dependency (may be an alias).
    pub name: String,
    /// Version requirement string, e.g. `^1.0`.
    pub req: String,
    /// Features enabled on the dependency.
    #[serde(default)]
    pub features: Vec<String>,
    /// Whether the dependency is behind a feature.
    #[serde(default)]
    pub optional: bool,
    /// Whether the dependency's default features are enabled.
    #[serde(default = "default_true")]
    pub default_features: bool,
    /// Platform filter, either `cfg(...)` or a target triple.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: DepKind,
    /// Real package name when `name` is a rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Old index entries carry `"kind": null` for normal dependencies.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl IndexDependency {
    /// Create a normal, non-optional dependency.
    pub fn new(name: impl Into<String>, req: impl Into<String>) -> Self {
        IndexDependency {
            name: name.into(),
            req: req.into(),
            features: Vec::new(),
            optional: false,
            default_features: true,
            target: None,
            kind: DepKind::Normal,
            package: None,
        }
    }

    /// The package this edge points to, following renames.
    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }

    pub fn with_kind(mut self, kind: DepKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_default_features(mut self, enabled: bool) -> Self {
        self.default_features = enabled;
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }
}

/// One published version of a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Package name as published.
    pub name: String,
    /// Version string.
    pub vers: String,
    /// Declared dependencies.
    #[serde(default)]
    pub deps: Vec<IndexDependency>,
    /// SHA-256 of the `.crate` archive, lowercase hex.
    pub cksum: String,
    /// Feature table.
    #[serde(default)]
    pub features: BTreeMap<String, Vec<String>>,
    /// Features using the `dep:` / `?/` syntax, split out by the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features2: Option<BTreeMap<String, Vec<String>>>,
    /// Withdrawn versions stay in the index but are not resolved to.
    #[serde(default)]
    pub yanked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,
    /// Download count, when the index snapshot was enriched with statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    /// Publication time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip)]
    raw: String,
}

impl IndexRecord {
    /// Create a bare record with no dependencies and an empty checksum.
    pub fn new(name: impl Into<String>, vers: impl Into<String>) -> Self {
        IndexRecord {
            name: name.into(),
            vers: vers.into(),
            deps: Vec::new(),
            cksum: String::new(),
            features: BTreeMap::new(),
            features2: None,
            yanked: false,
            links: None,
            downloads: None,
            published: None,
            raw: String::new(),
        }
    }

    /// Parse one index line, keeping the line itself.
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        let mut record: IndexRecord = serde_json::from_str(line)?;
        record.raw = line.to_string();
        Ok(record)
    }

    /// The line to write into an index file.
    ///
    /// Records parsed from an index return their original text; records
    /// built in memory are serialized.
    pub fn line(&self) -> Result<Cow<'_, str>> {
        if self.raw.is_empty() {
            Ok(Cow::Owned(serde_json::to_string(self)?))
        } else {
            Ok(Cow::Borrowed(&self.raw))
        }
    }

    /// Merged view of `features` and `features2`.
    pub fn all_features(&self) -> BTreeMap<String, Vec<String>> {
        let mut all = self.features.clone();
        if let Some(extra) = &self.features2 {
            for (name, values) in extra {
                all.entry(name.clone()).or_default().extend(values.iter().cloned());
            }
        }
        all
    }

    pub fn with_dep(mut self, dep: IndexDependency) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn with_yanked(mut self, yanked: bool) -> Self {
        self.yanked = yanked;
        self
    }

    pub fn with_cksum(mut self, cksum: impl Into<String>) -> Self {
        self.cksum = cksum.into();
        self
    }

    pub fn with_feature(mut self, name: &str, enables: &[&str]) -> Self {
        self.features
            .insert(name.to_string(), enables.iter().map(|f| f.to_string()).collect());
        self
    }
}
