//! Selecting the packages a mirror is built from.
//!
//! The selection is the union of hand-picked names (additions, commands,
//! cookbook dependencies), the overall download ranking, and per-category
//! rankings. Exclusion patterns are applied last and win over every origin.
//! Unknown categories and names are reported as warnings; they never abort.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{debug, info, warn};

use topcrates_index::{validate_name, IndexSource};

use crate::config::Config;
use crate::error::{MirrorError, Result};
use crate::stats::DownloadStats;

/// Compiled exclusion patterns.
///
/// Matching is a pure function of the name: `*`, `?` and `[...]` have their
/// glob meaning, case is ignored, and nothing touches the filesystem.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    patterns: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl Exclusions {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|source| MirrorError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Exclusions { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The first pattern matching `name`, if any.
    pub fn matching(&self, name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches_with(name, MATCH_OPTIONS))
            .map(Pattern::as_str)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.matching(name).is_some()
    }
}

/// Why a package was selected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Origin {
    Addition,
    Command,
    Cookbook,
    TopOverall { rank: usize },
    Category { category: String, rank: usize },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Addition => write!(f, "addition"),
            Origin::Command => write!(f, "command"),
            Origin::Cookbook => write!(f, "cookbook"),
            Origin::TopOverall { rank } => write!(f, "top #{rank}"),
            Origin::Category { category, rank } => write!(f, "{category} #{rank}"),
        }
    }
}

/// A non-fatal selection problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SelectionWarning {
    /// No package in the statistics carries the category.
    UnknownCategory { category: String },
    /// A category filter names a category the configuration has no quota for.
    CategoryNotConfigured { category: String },
    /// An explicitly listed name is not in the index.
    UnknownPackage { name: String, origin: Origin },
    /// An explicitly listed name is not a valid package name.
    InvalidName { name: String, detail: String },
    /// The index file of an explicitly listed name could not be read.
    Unreadable { name: String, detail: String },
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionWarning::UnknownCategory { category } => {
                write!(f, "category '{category}' has no packages")
            }
            SelectionWarning::CategoryNotConfigured { category } => {
                write!(f, "category '{category}' is not configured")
            }
            SelectionWarning::UnknownPackage { name, origin } => {
                write!(f, "'{name}' ({origin}) is not in the index")
            }
            SelectionWarning::InvalidName { name, detail } => {
                write!(f, "'{name}' is not a valid package name: {detail}")
            }
            SelectionWarning::Unreadable { name, detail } => {
                write!(f, "cannot read index entry for '{name}': {detail}")
            }
        }
    }
}

/// Inputs to selection, detached from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct SelectionRequest {
    pub top_crates: usize,
    pub categories: Vec<(String, usize)>,
    pub additions: Vec<String>,
    pub commands: Vec<String>,
    pub cookbook: Vec<String>,
    pub exclusions: Exclusions,
    /// When non-empty, only these configured categories take part.
    pub category_filter: Vec<String>,
}

impl SelectionRequest {
    /// Build a request from the configuration and the cookbook dependency
    /// names (empty when the cookbook is disabled).
    pub fn from_config(config: &Config, cookbook: Vec<String>) -> Result<Self> {
        Ok(SelectionRequest {
            top_crates: config.top_crates,
            categories: config.category_quotas(),
            additions: config.additions.clone(),
            commands: config.commands.clone(),
            cookbook,
            exclusions: config.exclusions()?,
            category_filter: Vec::new(),
        })
    }

    pub fn only_categories(mut self, categories: &[String]) -> Self {
        self.category_filter = categories.to_vec();
        self
    }

    fn active_categories(&self) -> impl Iterator<Item = &(String, usize)> {
        self.categories.iter().filter(|(name, _)| {
            self.category_filter.is_empty() || self.category_filter.contains(name)
        })
    }
}

/// The outcome of selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    /// Selected names, deduplicated and sorted.
    pub names: BTreeSet<String>,
    /// Every reason each selected name was picked.
    pub origins: BTreeMap<String, BTreeSet<Origin>>,
    /// Names removed by an exclusion pattern, with the pattern.
    pub excluded: BTreeMap<String, String>,
    pub warnings: Vec<SelectionWarning>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn add(&mut self, name: &str, origin: Origin) {
        self.names.insert(name.to_string());
        self.origins.entry(name.to_string()).or_default().insert(origin);
    }

    fn warn(&mut self, warning: SelectionWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Compute the selection set.
pub fn select(
    request: &SelectionRequest,
    stats: &DownloadStats,
    index: &dyn IndexSource,
) -> Selection {
    let mut selection = Selection::default();

    let explicit = request
        .additions
        .iter()
        .map(|n| (n, Origin::Addition))
        .chain(request.commands.iter().map(|n| (n, Origin::Command)))
        .chain(request.cookbook.iter().map(|n| (n, Origin::Cookbook)));
    for (name, origin) in explicit {
        if let Err(e) = validate_name(name) {
            selection.warn(SelectionWarning::InvalidName {
                name: name.clone(),
                detail: e.to_string(),
            });
            continue;
        }
        match index.contains(name) {
            Ok(true) => selection.add(name, origin),
            Ok(false) => selection.warn(SelectionWarning::UnknownPackage {
                name: name.clone(),
                origin,
            }),
            Err(e) => selection.warn(SelectionWarning::Unreadable {
                name: name.clone(),
                detail: e.to_string(),
            }),
        }
    }

    if request.top_crates > 0 {
        for (i, entry) in stats.top(request.top_crates).into_iter().enumerate() {
            selection.add(&entry.name, Origin::TopOverall { rank: i + 1 });
        }
    }

    for category in &request.category_filter {
        if !request.categories.iter().any(|(name, _)| name == category) {
            selection.warn(SelectionWarning::CategoryNotConfigured {
                category: category.clone(),
            });
        }
    }

    for (category, quota) in request.active_categories() {
        if !stats.has_category(category) {
            selection.warn(SelectionWarning::UnknownCategory {
                category: category.clone(),
            });
            continue;
        }
        let top = stats.top_in_category(category, *quota);
        debug!(category = %category, quota, picked = top.len(), "category ranking");
        for (i, entry) in top.into_iter().enumerate() {
            selection.add(
                &entry.name,
                Origin::Category {
                    category: category.clone(),
                    rank: i + 1,
                },
            );
        }
    }

    if !request.exclusions.is_empty() {
        let excluded: Vec<(String, String)> = selection
            .names
            .iter()
            .filter_map(|name| {
                request
                    .exclusions
                    .matching(name)
                    .map(|p| (name.clone(), p.to_string()))
            })
            .collect();
        for (name, pattern) in excluded {
            debug!(package = %name, pattern = %pattern, "excluded");
            selection.names.remove(&name);
            selection.origins.remove(&name);
            selection.excluded.insert(name, pattern);
        }
    }

    info!(
        selected = selection.len(),
        excluded = selection.excluded.len(),
        warnings = selection.warnings.len(),
        "selection complete"
    );
    selection
}

/// Package names from the `[dependencies]` table of a Cargo manifest.
///
/// Renamed entries (`alias = { package = "real" }`) yield the real name.
pub fn cookbook_dependencies(manifest: &str) -> Result<Vec<String>> {
    let table: toml::Table = toml::from_str(manifest)?;
    let Some(deps) = table.get("dependencies").and_then(toml::Value::as_table) else {
        return Ok(Vec::new());
    };
    let names = deps
        .iter()
        .map(|(key, value)| {
            value
                .get("package")
                .and_then(toml::Value::as_str)
                .unwrap_or(key)
                .to_string()
        })
        .collect::<BTreeSet<_>>();
    Ok(names.into_iter().collect())
}
