//! Human-readable and JSON reports.
//!
//! Tree output:
//! ```text
//! app v1.0.0
//! ├── http v0.2.9
//! │   └── bytes v1.5.0
//! └── log v0.4.20
//!     └── bytes v1.5.0 (*)
//! ```
//! `(*)` marks a package whose dependencies were already shown.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::closure::{Closure, Omission, PackageId};
use crate::mirror::{MirrorReport, VerifyReport};
use crate::selection::{Selection, SelectionWarning};

/// Selected names with the reasons they were picked.
pub fn format_selection(selection: &Selection) -> String {
    let mut out = String::new();
    for name in &selection.names {
        let origins: Vec<String> = selection
            .origins
            .get(name)
            .into_iter()
            .flatten()
            .map(ToString::to_string)
            .collect();
        out.push_str(&format!("{name} ({})\n", origins.join(", ")));
    }
    for (name, pattern) in &selection.excluded {
        out.push_str(&format!("excluded: {name} (matches '{pattern}')\n"));
    }
    for warning in &selection.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out.push_str(&format!(
        "\n{} selected, {} excluded\n",
        selection.len(),
        selection.excluded.len()
    ));
    out
}

/// Flat, sorted list of the closure.
pub fn format_closure(closure: &Closure) -> String {
    let mut out = String::new();
    for id in &closure.packages {
        out.push_str(&format!("{id}\n"));
    }
    out.push_str(&format!(
        "\n{} versions of {} packages\n",
        closure.len(),
        closure.by_name().len()
    ));
    out
}

/// Dependency trees rooted at the selected packages.
pub fn format_tree(closure: &Closure) -> String {
    let mut out = String::new();
    let mut shown = BTreeSet::new();
    for root in &closure.roots {
        out.push_str(&format!("{root}\n"));
        shown.insert(root.clone());
        format_children(&mut out, closure, root, "", &mut shown);
    }
    out
}

fn format_children(
    out: &mut String,
    closure: &Closure,
    parent: &PackageId,
    prefix: &str,
    shown: &mut BTreeSet<PackageId>,
) {
    let children: Vec<&PackageId> = closure.dependencies_of(parent).collect();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let is_last = i == count - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let repeated = !shown.insert(child.clone());
        let marker = if repeated { " (*)" } else { "" };
        out.push_str(&format!("{prefix}{connector}{child}{marker}\n"));

        if !repeated {
            let child_prefix = if is_last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };
            format_children(out, closure, child, &child_prefix, shown);
        }
    }
}

pub fn format_omissions(omissions: &BTreeSet<Omission>) -> String {
    let mut out = String::new();
    for omission in omissions {
        out.push_str(&format!("  ! {omission}\n"));
    }
    if !omissions.is_empty() {
        out.push_str(&format!("{} omitted\n", omissions.len()));
    }
    out
}

pub fn format_mirror_report(report: &MirrorReport) -> String {
    let mut out = String::new();
    for id in &report.missing {
        out.push_str(&format!("  missing archive: {id}\n"));
    }
    for failure in &report.failed {
        out.push_str(&format!("  failed: {}: {}\n", failure.package, failure.detail));
    }
    out.push_str(&format!(
        "Mirror: {} indexed, {} copied, {} already present, {} missing, {} failed\n",
        report.indexed.len(),
        report.copied.len(),
        report.skipped.len(),
        report.missing.len(),
        report.failed.len()
    ));
    out
}

pub fn format_verify_report(report: &VerifyReport) -> String {
    let mut out = String::new();
    for id in &report.missing {
        out.push_str(&format!("  missing: {id}\n"));
    }
    for corruption in &report.corrupt {
        out.push_str(&format!(
            "  corrupt: {} (expected {}, got {})\n",
            corruption.package, corruption.expected, corruption.actual
        ));
    }
    for orphan in &report.orphans {
        out.push_str(&format!("  orphan: {}\n", orphan.display()));
    }
    out.push_str(&format!(
        "Verified {} archives: {}\n",
        report.verified,
        if report.is_ok() { "OK" } else { "PROBLEMS FOUND" }
    ));
    out
}

/// Machine-readable report of a selection and its closure.
#[derive(Debug, Clone, Serialize)]
pub struct ClosureSummary {
    pub selected: Vec<String>,
    pub excluded: Vec<String>,
    pub warnings: Vec<SelectionWarning>,
    /// Closed versions by package name.
    pub packages: BTreeMap<String, Vec<String>>,
    pub omissions: Vec<Omission>,
}

impl ClosureSummary {
    pub fn new(selection: &Selection, closure: &Closure) -> Self {
        ClosureSummary {
            selected: selection.names.iter().cloned().collect(),
            excluded: selection.excluded.keys().cloned().collect(),
            warnings: selection.warnings.clone(),
            packages: closure
                .by_name()
                .into_iter()
                .map(|(name, versions)| {
                    (
                        name.to_string(),
                        versions.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
            omissions: closure.omissions.iter().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
