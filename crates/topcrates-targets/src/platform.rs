//! Deployment target descriptions.
//!
//! A target is its triple plus the `cfg` values the compiler would set for
//! it: key/value pairs such as `target_os = "linux"` and bare flags such as
//! `unix`. A handful of common triples are built in; anything else is
//! described in configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TargetError};

/// One cfg value or several (`target_family` can be both `unix` and `wasm`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CfgValues {
    One(String),
    Many(Vec<String>),
}

impl CfgValues {
    fn contains(&self, value: &str) -> bool {
        match self {
            CfgValues::One(v) => v == value,
            CfgValues::Many(vs) => vs.iter().any(|v| v == value),
        }
    }
}

/// A target the mirror is meant to build for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeploymentTarget {
    /// Target triple, e.g. `x86_64-unknown-linux-gnu`.
    pub triple: String,
    /// Key/value cfg settings.
    #[serde(default)]
    pub cfg: BTreeMap<String, CfgValues>,
    /// Bare cfg names that are set, e.g. `unix`.
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

/// Built-in triples: (triple, arch, os, family, env, vendor, pointer width).
const BUILTIN: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    ("x86_64-unknown-linux-gnu", "x86_64", "linux", "unix", "gnu", "unknown", "64"),
    ("x86_64-unknown-linux-musl", "x86_64", "linux", "unix", "musl", "unknown", "64"),
    ("aarch64-unknown-linux-gnu", "aarch64", "linux", "unix", "gnu", "unknown", "64"),
    ("i686-unknown-linux-gnu", "x86", "linux", "unix", "gnu", "unknown", "32"),
    ("x86_64-apple-darwin", "x86_64", "macos", "unix", "", "apple", "64"),
    ("aarch64-apple-darwin", "aarch64", "macos", "unix", "", "apple", "64"),
    ("x86_64-pc-windows-msvc", "x86_64", "windows", "windows", "msvc", "pc", "64"),
    ("x86_64-pc-windows-gnu", "x86_64", "windows", "windows", "gnu", "pc", "64"),
    ("i686-pc-windows-msvc", "x86", "windows", "windows", "msvc", "pc", "32"),
    ("wasm32-unknown-unknown", "wasm32", "unknown", "wasm", "", "unknown", "32"),
];

impl DeploymentTarget {
    /// Look up a built-in target by triple.
    pub fn builtin(triple: &str) -> Option<Self> {
        BUILTIN
            .iter()
            .find(|entry| entry.0 == triple)
            .map(|&(triple, arch, os, family, env, vendor, width)| {
                let mut cfg = BTreeMap::new();
                let mut set = |key: &str, value: &str| {
                    cfg.insert(key.to_string(), CfgValues::One(value.to_string()));
                };
                set("target_arch", arch);
                set("target_os", os);
                set("target_family", family);
                set("target_env", env);
                set("target_vendor", vendor);
                set("target_pointer_width", width);
                set("target_endian", "little");

                let mut flags = BTreeSet::new();
                if family == "unix" || family == "windows" {
                    flags.insert(family.to_string());
                }

                DeploymentTarget {
                    triple: triple.to_string(),
                    cfg,
                    flags,
                }
            })
    }

    /// Names of all built-in triples.
    pub fn builtin_triples() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|entry| entry.0)
    }

    /// Resolve a triple against custom definitions first, then the built-ins.
    pub fn resolve(triple: &str, custom: &[DeploymentTarget]) -> Result<Self> {
        if let Some(target) = custom.iter().find(|t| t.triple == triple) {
            return Ok(target.clone());
        }
        DeploymentTarget::builtin(triple).ok_or_else(|| TargetError::UnknownTarget {
            triple: triple.to_string(),
            builtin: DeploymentTarget::builtin_triples()
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Check a custom definition for structural problems.
    pub fn validate(&self) -> Result<()> {
        if self.triple.is_empty() || self.triple.contains(char::is_whitespace) {
            return Err(TargetError::Validation {
                detail: format!("target triple '{}' is empty or contains whitespace", self.triple),
            });
        }
        if !self.cfg.contains_key("target_os") || !self.cfg.contains_key("target_arch") {
            return Err(TargetError::Validation {
                detail: format!(
                    "target '{}' must set at least target_os and target_arch",
                    self.triple
                ),
            });
        }
        Ok(())
    }

    /// Whether `key = "value"` holds for this target.
    pub fn has_cfg(&self, key: &str, value: &str) -> bool {
        self.cfg.get(key).is_some_and(|values| values.contains(value))
    }

    /// Whether the bare cfg name is set for this target.
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }
}
