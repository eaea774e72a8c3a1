//! Index-wide download statistics.
//!
//! File format:
//! ```json
//! {"crates": [{"name": "serde", "downloads": 100, "categories": ["encoding"]}]}
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};

/// Download count and categories of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl StatsEntry {
    pub fn new(name: impl Into<String>, downloads: u64, categories: &[&str]) -> Self {
        StatsEntry {
            name: name.into(),
            downloads,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatsFile {
    crates: Vec<StatsEntry>,
}

/// Packages ranked by downloads.
#[derive(Debug, Clone, Default)]
pub struct DownloadStats {
    ranked: Vec<StatsEntry>,
}

impl DownloadStats {
    /// Rank entries by downloads descending, then by name ascending.
    pub fn from_entries(mut entries: Vec<StatsEntry>) -> Self {
        entries.sort_by(|a, b| b.downloads.cmp(&a.downloads).then_with(|| a.name.cmp(&b.name)));
        DownloadStats { ranked: entries }
    }

    pub fn parse(input: &str) -> serde_json::Result<Self> {
        let file: StatsFile = serde_json::from_str(input)?;
        Ok(DownloadStats::from_entries(file.crates))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MirrorError::Stats {
            path: path.to_path_buf(),
            detail: format!("cannot read: {e}"),
        })?;
        DownloadStats::parse(&content).map_err(|e| MirrorError::Stats {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// The `k` most downloaded packages; `k = 0` returns all of them.
    pub fn top(&self, k: usize) -> Vec<&StatsEntry> {
        take(self.ranked.iter(), k)
    }

    /// The `k` most downloaded packages tagged with `category`.
    pub fn top_in_category(&self, category: &str, k: usize) -> Vec<&StatsEntry> {
        take(
            self.ranked.iter().filter(|e| e.categories.contains(category)),
            k,
        )
    }

    /// Whether any package carries `category`.
    pub fn has_category(&self, category: &str) -> bool {
        self.ranked.iter().any(|e| e.categories.contains(category))
    }
}

fn take<'a>(entries: impl Iterator<Item = &'a StatsEntry>, k: usize) -> Vec<&'a StatsEntry> {
    if k == 0 {
        entries.collect()
    } else {
        entries.take(k).collect()
    }
}
