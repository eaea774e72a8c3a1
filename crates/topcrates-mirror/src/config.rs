//! `top-crates.toml` parsing.
//!
//! The file names what to select (explicit names, category quotas,
//! exclusions), how to walk dependencies, and where the index, statistics,
//! archive cache, and output live. Relative paths are resolved against the
//! directory holding the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use topcrates_targets::{DeploymentTarget, TargetSet};

use crate::closure::{ClosureOptions, OptionalDeps};
use crate::error::{MirrorError, Result};
use crate::selection::Exclusions;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "top-crates.toml";

/// Upstream crates.io index repository.
pub const CRATES_IO_INDEX_URL: &str = "https://github.com/rust-lang/crates.io-index";

/// The top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Number of packages to take from the overall download ranking.
    #[serde(default)]
    pub top_crates: usize,
    /// Include the dependencies of the Rust Cookbook manifest.
    #[serde(default)]
    pub cookbook: bool,
    /// Category quotas, each entry `{ category = quota }`; quota 0 takes all.
    #[serde(default)]
    pub categories: Vec<BTreeMap<String, usize>>,
    /// Glob patterns removing packages from the selection.
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Packages providing commands (`cargo-*` tools and the like).
    #[serde(default)]
    pub commands: Vec<String>,
    /// Hand-picked packages.
    #[serde(default)]
    pub additions: Vec<String>,
    /// Dependency traversal settings.
    #[serde(default)]
    pub closure: ClosureConfig,
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// `[closure]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ClosureConfig {
    /// Follow dev-dependency edges too.
    #[serde(default)]
    pub dev_dependencies: bool,
    /// How optional dependencies are treated.
    #[serde(default)]
    pub optional: OptionalDeps,
    /// Target triples to keep platform-specific edges for; empty keeps all.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Definitions for triples that are not built in.
    #[serde(default)]
    pub custom_target: Vec<DeploymentTarget>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PathsConfig {
    /// crates.io-index checkout.
    #[serde(default = "default_index")]
    pub index: PathBuf,
    /// Git URL the index is cloned from.
    #[serde(default = "default_index_url")]
    pub index_url: String,
    /// Download statistics JSON.
    #[serde(default = "default_stats")]
    pub stats: PathBuf,
    /// Directory of source `.crate` archives.
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
    /// Local registry to write.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Cargo manifest whose dependencies the `cookbook` switch adds.
    #[serde(default = "default_cookbook_manifest")]
    pub cookbook_manifest: PathBuf,
}

fn default_index() -> PathBuf {
    PathBuf::from("crates.io-index")
}

fn default_index_url() -> String {
    CRATES_IO_INDEX_URL.to_string()
}

fn default_stats() -> PathBuf {
    PathBuf::from("crate-stats.json")
}

fn default_cache() -> PathBuf {
    PathBuf::from("crates")
}

fn default_output() -> PathBuf {
    PathBuf::from("local-registry")
}

fn default_cookbook_manifest() -> PathBuf {
    PathBuf::from("rust-cookbook/Cargo.toml")
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            index: default_index(),
            index_url: default_index_url(),
            stats: default_stats(),
            cache: default_cache(),
            output: default_output(),
            cookbook_manifest: default_cookbook_manifest(),
        }
    }
}

impl Config {
    /// Parse a configuration from a TOML string.
    ///
    /// Relative paths resolve against the current directory.
    pub fn parse(input: &str) -> Result<Self> {
        let config: Config = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MirrorError::Config {
            path: path.to_path_buf(),
            detail: format!("cannot read: {e}"),
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| MirrorError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.validate().map_err(|e| MirrorError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.exclusions()?;
        for target in &self.closure.custom_target {
            target.validate()?;
        }
        Ok(())
    }

    /// Category quotas in configuration order.
    pub fn category_quotas(&self) -> Vec<(String, usize)> {
        self.categories
            .iter()
            .flat_map(|entry| entry.iter().map(|(name, quota)| (name.clone(), *quota)))
            .collect()
    }

    /// Whether selection needs the download statistics file.
    pub fn needs_stats(&self) -> bool {
        self.top_crates > 0 || !self.categories.is_empty()
    }

    /// Compile the exclusion patterns.
    pub fn exclusions(&self) -> Result<Exclusions> {
        Exclusions::new(&self.exclusions)
    }

    /// Traversal options, with `targets` overriding the configured triples
    /// when non-empty.
    pub fn closure_options(&self, targets: &[String]) -> Result<ClosureOptions> {
        let triples = if targets.is_empty() {
            &self.closure.targets
        } else {
            targets
        };
        Ok(ClosureOptions {
            dev_dependencies: self.closure.dev_dependencies,
            optional: self.closure.optional,
            targets: TargetSet::from_triples(triples, &self.closure.custom_target)?,
        })
    }

    /// Resolve a configured path against the configuration directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.paths.index)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.resolve(&self.paths.stats)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.paths.cache)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.paths.output)
    }

    pub fn cookbook_manifest(&self) -> PathBuf {
        self.resolve(&self.paths.cookbook_manifest)
    }

    /// A starter configuration.
    pub fn template() -> String {
        r#"# Packages ranked by downloads, index-wide.
top-crates = 100

# Also take the dependencies of the Rust Cookbook manifest.
cookbook = false

# Top N per category; 0 takes every package in the category.
categories = [
    { network-programming = 100 },
    { filesystem = 10 },
    { web-programming = 10 },
]

exclusions = []
commands = []
additions = []

[closure]
dev-dependencies = false
# "skip", "all" or "features"
optional = "skip"
targets = ["x86_64-unknown-linux-gnu"]

[paths]
index = "crates.io-index"
stats = "crate-stats.json"
cache = "crates"
output = "local-registry"
"#
        .to_string()
    }
}
