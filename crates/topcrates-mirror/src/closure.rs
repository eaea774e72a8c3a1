//! Dependency closure over the index.
//!
//! Starting from the current version of every selected package, walks the
//! declared dependency edges and resolves each requirement to the highest
//! non-yanked version that satisfies it. The walk is a plain worklist over
//! `(name, version)` pairs: no version solving, no conflict resolution.
//! Several versions of one package may end up in the closure.
//!
//! Edges that cannot be resolved are recorded as [`Omission`]s and the walk
//! goes on without them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use topcrates_index::{
    parse_requirement, DepKind, IndexDependency, IndexRecord, IndexSource, Package, Version,
};
use topcrates_targets::TargetSet;

/// Treatment of optional dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalDeps {
    /// Never follow optional edges.
    #[default]
    Skip,
    /// Always follow optional edges.
    All,
    /// Follow optional edges enabled by the features reaching the package.
    Features,
}

/// Traversal settings.
#[derive(Debug, Clone, Default)]
pub struct ClosureOptions {
    pub dev_dependencies: bool,
    pub optional: OptionalDeps,
    pub targets: TargetSet,
}

/// One version of one package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        PackageId {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Why a package or edge was left out of the closure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OmissionReason {
    /// The package is not in the index.
    NotInIndex,
    /// Every version of a selected package is yanked.
    NoViableVersion,
    /// No non-yanked version satisfies the requirement.
    Unsatisfiable,
    /// The requirement string does not parse.
    InvalidRequirement { detail: String },
    /// The index entry could not be read.
    Unreadable { detail: String },
}

/// A package or dependency edge that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Omission {
    /// The dependent, `None` for a selected package.
    pub required_by: Option<PackageId>,
    pub name: String,
    pub requirement: Option<String>,
    pub reason: OmissionReason,
}

impl fmt::Display for Omission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.required_by {
            Some(parent) => write!(f, "{parent} -> {}", self.name)?,
            None => write!(f, "{} (selected)", self.name)?,
        }
        if let Some(req) = &self.requirement {
            write!(f, " {req}")?;
        }
        match &self.reason {
            OmissionReason::NotInIndex => write!(f, ": not in the index"),
            OmissionReason::NoViableVersion => write!(f, ": every version is yanked"),
            OmissionReason::Unsatisfiable => write!(f, ": no non-yanked version matches"),
            OmissionReason::InvalidRequirement { detail } => {
                write!(f, ": invalid requirement: {detail}")
            }
            OmissionReason::Unreadable { detail } => write!(f, ": unreadable: {detail}"),
        }
    }
}

/// The transitively complete set of package versions.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    /// Current versions of the selected packages.
    pub roots: BTreeSet<PackageId>,
    pub packages: BTreeSet<PackageId>,
    /// Followed edges, dependent to dependencies.
    pub edges: BTreeMap<PackageId, BTreeSet<PackageId>>,
    pub omissions: BTreeSet<Omission>,
    /// Features activated per package, in `features` mode only.
    pub features: BTreeMap<PackageId, BTreeSet<String>>,
}

impl Closure {
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.packages.contains(id)
    }

    /// Whether `name` is in the closure at `version`.
    pub fn contains_version(&self, name: &str, version: &Version) -> bool {
        self.versions_of(name).any(|v| v == version)
    }

    /// Versions of `name` in the closure, ascending.
    pub fn versions_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Version> + 'a {
        self.packages
            .iter()
            .filter(move |id| id.name == name)
            .map(|id| &id.version)
    }

    /// Package names with their closed versions, ascending.
    pub fn by_name(&self) -> BTreeMap<&str, Vec<&Version>> {
        let mut map: BTreeMap<&str, Vec<&Version>> = BTreeMap::new();
        for id in &self.packages {
            map.entry(id.name.as_str()).or_default().push(&id.version);
        }
        map
    }

    pub fn dependencies_of(&self, id: &PackageId) -> impl Iterator<Item = &PackageId> {
        self.edges.get(id).into_iter().flatten()
    }

    fn omit(&mut self, omission: Omission) {
        if !self.omissions.contains(&omission) {
            warn!("{omission}");
            self.omissions.insert(omission);
        }
    }
}

/// Features requested of a package version by its dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FeatureRequest {
    features: BTreeSet<String>,
    default_features: bool,
}

impl FeatureRequest {
    fn defaults() -> Self {
        FeatureRequest {
            features: BTreeSet::new(),
            default_features: true,
        }
    }

    /// Merge `other` in, returning whether anything changed.
    fn merge(&mut self, other: &FeatureRequest) -> bool {
        let before = (self.features.len(), self.default_features);
        self.features.extend(other.features.iter().cloned());
        self.default_features |= other.default_features;
        before != (self.features.len(), self.default_features)
    }
}

/// Result of evaluating a version's feature table.
#[derive(Debug, Default)]
struct Activation {
    features: BTreeSet<String>,
    /// Optional dependencies switched on, by the dependent's name for them.
    deps: BTreeSet<String>,
    /// Features forwarded to dependencies (`dep/feat`).
    forwarded: BTreeMap<String, BTreeSet<String>>,
}

fn activate(record: &IndexRecord, request: &FeatureRequest) -> Activation {
    let table = record.all_features();
    let optional: BTreeSet<&str> = record
        .deps
        .iter()
        .filter(|d| d.optional)
        .map(|d| d.name.as_str())
        .collect();

    let mut activation = Activation::default();
    let mut pending: Vec<String> = request.features.iter().cloned().collect();
    if request.default_features && table.contains_key("default") {
        pending.push("default".to_string());
    }

    while let Some(feature) = pending.pop() {
        if !activation.features.insert(feature.clone()) {
            continue;
        }
        let Some(entries) = table.get(&feature) else {
            // Implicit feature of an optional dependency.
            if optional.contains(feature.as_str()) {
                activation.deps.insert(feature);
            }
            continue;
        };
        for entry in entries {
            if let Some(dep) = entry.strip_prefix("dep:") {
                activation.deps.insert(dep.to_string());
            } else if let Some((dep, feat)) = entry.split_once('/') {
                let weak = dep.ends_with('?');
                let dep = dep.trim_end_matches('?');
                if !weak {
                    activation.deps.insert(dep.to_string());
                    if table.contains_key(dep) {
                        pending.push(dep.to_string());
                    }
                }
                activation
                    .forwarded
                    .entry(dep.to_string())
                    .or_default()
                    .insert(feat.to_string());
            } else {
                pending.push(entry.clone());
            }
        }
    }
    activation
}

struct Builder<'a> {
    index: &'a dyn IndexSource,
    options: &'a ClosureOptions,
    closure: Closure,
    requested: BTreeMap<PackageId, FeatureRequest>,
    queue: VecDeque<PackageId>,
}

impl<'a> Builder<'a> {
    fn lookup(
        &mut self,
        name: &str,
        required_by: Option<&PackageId>,
        requirement: Option<&str>,
    ) -> Option<Arc<Package>> {
        let reason = match self.index.package(name) {
            Ok(Some(package)) => return Some(package),
            Ok(None) => OmissionReason::NotInIndex,
            Err(e) => OmissionReason::Unreadable {
                detail: e.to_string(),
            },
        };
        self.closure.omit(Omission {
            required_by: required_by.cloned(),
            name: name.to_string(),
            requirement: requirement.map(str::to_string),
            reason,
        });
        None
    }

    /// Add a pair to the closure, queueing it when it is new or, in
    /// `features` mode, when its requested features grew.
    fn request(&mut self, id: PackageId, request: FeatureRequest) {
        let new = self.closure.packages.insert(id.clone());
        let grew = match self.requested.get_mut(&id) {
            Some(existing) => existing.merge(&request),
            None => {
                self.requested.insert(id.clone(), request);
                true
            }
        };
        let features_mode = self.options.optional == OptionalDeps::Features;
        if new || (features_mode && grew) {
            self.queue.push_back(id);
        }
    }

    fn follows(&self, dep: &IndexDependency, activation: &Activation) -> bool {
        if dep.kind == DepKind::Dev && !self.options.dev_dependencies {
            return false;
        }
        if !self.options.targets.allows(dep.target.as_deref()) {
            debug!(dep = %dep.name, target = ?dep.target, "platform filter excludes edge");
            return false;
        }
        if !dep.optional {
            return true;
        }
        match self.options.optional {
            OptionalDeps::Skip => false,
            OptionalDeps::All => true,
            OptionalDeps::Features => activation.deps.contains(&dep.name),
        }
    }

    fn expand(&mut self, id: PackageId) {
        let Some(package) = self.lookup(&id.name, None, None) else {
            return;
        };
        let Some(record) = package.record(&id.version) else {
            return;
        };

        let activation = if self.options.optional == OptionalDeps::Features {
            let request = self.requested.get(&id).cloned().unwrap_or_default();
            let activation = activate(record, &request);
            self.closure
                .features
                .insert(id.clone(), activation.features.clone());
            activation
        } else {
            Activation::default()
        };

        debug!(package = %id, deps = record.deps.len(), "expanding");
        for dep in &record.deps {
            if !self.follows(dep, &activation) {
                continue;
            }
            let target_name = dep.package_name();
            let req = match parse_requirement(&dep.req) {
                Ok(req) => req,
                Err(e) => {
                    self.closure.omit(Omission {
                        required_by: Some(id.clone()),
                        name: target_name.to_string(),
                        requirement: Some(dep.req.clone()),
                        reason: OmissionReason::InvalidRequirement {
                            detail: e.to_string(),
                        },
                    });
                    continue;
                }
            };
            let Some(target) = self.lookup(target_name, Some(&id), Some(&dep.req)) else {
                continue;
            };
            let Some(version) = target.best_match(&req) else {
                self.closure.omit(Omission {
                    required_by: Some(id.clone()),
                    name: target_name.to_string(),
                    requirement: Some(dep.req.clone()),
                    reason: OmissionReason::Unsatisfiable,
                });
                continue;
            };

            let target_id = PackageId::new(target.name(), version.clone());
            self.closure
                .edges
                .entry(id.clone())
                .or_default()
                .insert(target_id.clone());

            let mut features: BTreeSet<String> = dep.features.iter().cloned().collect();
            if let Some(forwarded) = activation.forwarded.get(&dep.name) {
                features.extend(forwarded.iter().cloned());
            }
            self.request(
                target_id,
                FeatureRequest {
                    features,
                    default_features: dep.default_features,
                },
            );
        }
    }
}

/// Compute the closure of the selected package names.
pub fn build_closure<'s>(
    selection: impl IntoIterator<Item = &'s String>,
    index: &dyn IndexSource,
    options: &ClosureOptions,
) -> Closure {
    let mut builder = Builder {
        index,
        options,
        closure: Closure::default(),
        requested: BTreeMap::new(),
        queue: VecDeque::new(),
    };

    for name in selection {
        let Some(package) = builder.lookup(name, None, None) else {
            continue;
        };
        let Some(version) = package.current() else {
            builder.closure.omit(Omission {
                required_by: None,
                name: name.clone(),
                requirement: None,
                reason: OmissionReason::NoViableVersion,
            });
            continue;
        };
        let mut roots = vec![version.clone()];
        if let Some(stable) = package.latest_stable().filter(|s| *s != version) {
            roots.push(stable.clone());
        }
        for version in roots {
            let id = PackageId::new(package.name(), version);
            builder.closure.roots.insert(id.clone());
            builder.request(id, FeatureRequest::defaults());
        }
    }

    while let Some(id) = builder.queue.pop_front() {
        builder.expand(id);
    }

    let closure = builder.closure;
    info!(
        roots = closure.roots.len(),
        packages = closure.len(),
        omissions = closure.omissions.len(),
        "closure complete"
    );
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use topcrates_index::{IndexDependency as Dep, MemoryIndex};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn id(name: &str, version: &str) -> PackageId {
        PackageId::new(name, v(version))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn closure_of(index: &MemoryIndex, selected: &[&str], options: &ClosureOptions) -> Closure {
        build_closure(&names(selected), index, options)
    }

    fn ids(closure: &Closure) -> Vec<String> {
        closure.packages.iter().map(|id| id.to_string()).collect()
    }

    /// Every followed, satisfiable edge of every closed pair lands in the closure.
    fn assert_transitively_complete(closure: &Closure, index: &MemoryIndex, options: &ClosureOptions) {
        for id in &closure.packages {
            let package = index.package(&id.name).unwrap().unwrap();
            let record = package.record(&id.version).unwrap();
            for dep in &record.deps {
                if dep.optional || (dep.kind == DepKind::Dev && !options.dev_dependencies) {
                    continue;
                }
                if !options.targets.allows(dep.target.as_deref()) {
                    continue;
                }
                let Ok(req) = parse_requirement(&dep.req) else {
                    continue;
                };
                let Some(target) = index.package(dep.package_name()).unwrap() else {
                    continue;
                };
                if let Some(version) = target.best_match(&req) {
                    assert!(
                        closure.contains_version(target.name(), version),
                        "{id} -> {} {version} missing",
                        target.name()
                    );
                }
            }
        }
    }

    fn web_index() -> MemoryIndex {
        MemoryIndex::new()
            .with(
                IndexRecord::new("app", "1.0.0")
                    .with_dep(Dep::new("http", "^0.2"))
                    .with_dep(Dep::new("log", "^0.4"))
                    .with_dep(Dep::new("cc", "^1").with_kind(DepKind::Build))
                    .with_dep(Dep::new("proptest", "^1").with_kind(DepKind::Dev)),
            )
            .with(IndexRecord::new("http", "0.2.0").with_dep(Dep::new("bytes", "^1")))
            .with(IndexRecord::new("http", "0.2.9").with_dep(Dep::new("bytes", "^1")))
            .with(IndexRecord::new("http", "1.0.0").with_dep(Dep::new("bytes", "^1")))
            .with(IndexRecord::new("bytes", "1.4.0"))
            .with(IndexRecord::new("bytes", "1.5.0"))
            .with(IndexRecord::new("log", "0.4.20").with_dep(Dep::new("cfg-if", "^1")))
            .with(IndexRecord::new("cfg-if", "1.0.0"))
            .with(IndexRecord::new("cc", "1.0.83"))
            .with(IndexRecord::new("proptest", "1.2.0").with_dep(Dep::new("rand", "^0.8")))
            .with(IndexRecord::new("rand", "0.8.5"))
    }

    #[test]
    fn follows_normal_and_build_edges() {
        let index = web_index();
        let options = ClosureOptions::default();
        let closure = closure_of(&index, &["app"], &options);
        assert_eq!(
            ids(&closure),
            vec![
                "app v1.0.0",
                "bytes v1.5.0",
                "cc v1.0.83",
                "cfg-if v1.0.0",
                "http v0.2.9",
                "log v0.4.20"
            ]
        );
        assert!(closure.omissions.is_empty());
        assert_eq!(closure.roots.len(), 1);
        assert_transitively_complete(&closure, &index, &options);
    }

    #[test]
    fn dev_dependencies_when_enabled() {
        let index = web_index();
        let options = ClosureOptions {
            dev_dependencies: true,
            ..Default::default()
        };
        let closure = closure_of(&index, &["app"], &options);
        assert!(closure.contains(&id("proptest", "1.2.0")));
        assert!(closure.contains(&id("rand", "0.8.5")));
        assert_transitively_complete(&closure, &index, &options);
    }

    #[test]
    fn several_versions_of_one_package() {
        let index = web_index().with(
            IndexRecord::new("server", "2.0.0")
                .with_dep(Dep::new("http", "^1"))
                .with_dep(Dep::new("app", "^1")),
        );
        let closure = closure_of(&index, &["server"], &ClosureOptions::default());
        let http: Vec<_> = closure.versions_of("http").map(Version::to_string).collect();
        assert_eq!(http, vec!["0.2.9", "1.0.0"]);
        assert_eq!(closure.by_name()["http"].len(), 2);
    }

    #[test]
    fn highest_non_yanked_match() {
        let index = MemoryIndex::new()
            .with(IndexRecord::new("root", "0.1.0").with_dep(Dep::new("lib", "^1.0")))
            .with(IndexRecord::new("lib", "1.0.0"))
            .with(IndexRecord::new("lib", "1.2.0").with_yanked(true))
            .with(IndexRecord::new("lib", "1.3.0"));
        let closure = closure_of(&index, &["root"], &ClosureOptions::default());
        assert!(closure.contains(&id("lib", "1.3.0")));
        assert!(!closure.contains(&id("lib", "1.2.0")));
        assert!(!closure.contains(&id("lib", "1.0.0")));
    }

    #[test]
    fn yanked_current_version_is_skipped() {
        let index = MemoryIndex::new()
            .with(IndexRecord::new("lib", "1.0.0"))
            .with(IndexRecord::new("lib", "2.0.0").with_yanked(true))
            .with(IndexRecord::new("gone", "1.0.0").with_yanked(true));
        let closure = closure_of(&index, &["lib", "gone"], &ClosureOptions::default());
        assert_eq!(ids(&closure), vec!["lib v1.0.0"]);
        assert!(closure.omissions.contains(&Omission {
            required_by: None,
            name: "gone".to_string(),
            requirement: None,
            reason: OmissionReason::NoViableVersion,
        }));
    }

    #[test]
    fn unsatisfiable_requirement_is_reported() {
        let index = MemoryIndex::new()
            .with(
                IndexRecord::new("root", "1.0.0")
                    .with_dep(Dep::new("old", "^9.0"))
                    .with_dep(Dep::new("fine", "^1")),
            )
            .with(IndexRecord::new("old", "1.0.0"))
            .with(IndexRecord::new("fine", "1.1.0"));
        let closure = closure_of(&index, &["root"], &ClosureOptions::default());
        assert_eq!(ids(&closure), vec!["fine v1.1.0", "root v1.0.0"]);
        assert_eq!(
            closure.omissions.iter().collect::<Vec<_>>(),
            vec![&Omission {
                required_by: Some(id("root", "1.0.0")),
                name: "old".to_string(),
                requirement: Some("^9.0".to_string()),
                reason: OmissionReason::Unsatisfiable,
            }]
        );
        assert!(closure.omissions.iter().next().unwrap().to_string().contains("^9.0"));
    }

    #[test]
    fn missing_and_malformed_dependencies() {
        let index = MemoryIndex::new().with(
            IndexRecord::new("root", "1.0.0")
                .with_dep(Dep::new("ghost", "^1"))
                .with_dep(Dep::new("bytes", "not a version")),
        );
        let closure = closure_of(&index, &["root", "nowhere"], &ClosureOptions::default());
        assert_eq!(closure.len(), 1);
        let reasons: Vec<_> = closure.omissions.iter().map(|o| &o.reason).collect();
        assert!(reasons.contains(&&OmissionReason::NotInIndex));
        assert!(reasons
            .iter()
            .any(|r| matches!(r, OmissionReason::InvalidRequirement { .. })));
        assert_eq!(closure.omissions.len(), 3);
    }

    #[test]
    fn cycles_and_diamonds_terminate() {
        let index = MemoryIndex::new()
            .with(
                IndexRecord::new("a", "1.0.0")
                    .with_dep(Dep::new("b", "^1"))
                    .with_dep(Dep::new("c", "^1")),
            )
            .with(IndexRecord::new("b", "1.0.0").with_dep(Dep::new("d", "^1")))
            .with(IndexRecord::new("c", "1.0.0").with_dep(Dep::new("d", "^1")))
            .with(IndexRecord::new("d", "1.0.0").with_dep(Dep::new("a", "^1")));
        let closure = closure_of(&index, &["a"], &ClosureOptions::default());
        assert_eq!(closure.len(), 4);
        assert!(closure.dependencies_of(&id("d", "1.0.0")).any(|p| p.name == "a"));
    }

    #[test]
    fn renamed_dependency_follows_package() {
        let index = MemoryIndex::new()
            .with(
                IndexRecord::new("root", "1.0.0")
                    .with_dep(Dep::new("rand_old", "^0.7").with_package("rand")),
            )
            .with(IndexRecord::new("rand", "0.7.3"))
            .with(IndexRecord::new("rand", "0.8.5"));
        let closure = closure_of(&index, &["root"], &ClosureOptions::default());
        assert!(closure.contains(&id("rand", "0.7.3")));
        assert!(closure.versions_of("rand_old").next().is_none());
    }

    #[test]
    fn platform_filters() {
        let index = MemoryIndex::new()
            .with(
                IndexRecord::new("root", "1.0.0")
                    .with_dep(Dep::new("winapi", "^0.3").with_target("cfg(windows)"))
                    .with_dep(Dep::new("libc", "^0.2").with_target("cfg(unix)"))
                    .with_dep(Dep::new("wasm-bindgen", "^0.2").with_target("wasm32-unknown-unknown")),
            )
            .with(IndexRecord::new("winapi", "0.3.9"))
            .with(IndexRecord::new("libc", "0.2.150"))
            .with(IndexRecord::new("wasm-bindgen", "0.2.89"));

        let all = closure_of(&index, &["root"], &ClosureOptions::default());
        assert_eq!(all.len(), 4);

        let options = ClosureOptions {
            targets: TargetSet::from_triples(&["x86_64-unknown-linux-gnu"], &[]).unwrap(),
            ..Default::default()
        };
        let linux = closure_of(&index, &["root"], &options);
        assert_eq!(ids(&linux), vec!["libc v0.2.150", "root v1.0.0"]);
        assert_transitively_complete(&linux, &index, &options);
    }

    fn optional_index() -> MemoryIndex {
        MemoryIndex::new()
            .with(
                IndexRecord::new("serde", "1.0.0")
                    .with_dep(Dep::new("serde_derive", "^1").with_optional(true))
                    .with_dep(Dep::new("std-shim", "^1").with_optional(true))
                    .with_feature("default", &["std"])
                    .with_feature("std", &["dep:std-shim"])
                    .with_feature("derive", &["serde_derive"]),
            )
            .with(IndexRecord::new("serde_derive", "1.0.0"))
            .with(IndexRecord::new("std-shim", "1.0.0"))
    }

    #[test]
    fn optional_skip_and_all() {
        let index = optional_index();
        let skip = closure_of(&index, &["serde"], &ClosureOptions::default());
        assert_eq!(ids(&skip), vec!["serde v1.0.0"]);

        let all = closure_of(
            &index,
            &["serde"],
            &ClosureOptions {
                optional: OptionalDeps::All,
                ..Default::default()
            },
        );
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn optional_by_features() {
        let index = optional_index().with(
            IndexRecord::new("app", "1.0.0").with_dep(
                Dep::new("serde", "^1")
                    .with_features(&["derive"])
                    .with_default_features(false),
            ),
        );
        let options = ClosureOptions {
            optional: OptionalDeps::Features,
            ..Default::default()
        };

        // Selected packages get their default features.
        let root = closure_of(&index, &["serde"], &options);
        assert_eq!(ids(&root), vec!["serde v1.0.0", "std-shim v1.0.0"]);
        assert!(root.features[&id("serde", "1.0.0")].contains("std"));

        // `derive` without defaults pulls serde_derive only.
        let app = closure_of(&index, &["app"], &options);
        assert_eq!(
            ids(&app),
            vec!["app v1.0.0", "serde v1.0.0", "serde_derive v1.0.0"]
        );

        // Both requests merge: the revisit with more features re-expands.
        let both = closure_of(&index, &["app", "serde"], &options);
        assert_eq!(both.len(), 4);
    }

    #[test]
    fn feature_forwarding() {
        let index = MemoryIndex::new()
            .with(
                IndexRecord::new("app", "1.0.0")
                    .with_dep(Dep::new("tokio", "^1").with_optional(true))
                    .with_dep(Dep::new("log", "^0.4").with_optional(true))
                    .with_feature("default", &["tokio/net", "log?/std"]),
            )
            .with(
                IndexRecord::new("tokio", "1.0.0")
                    .with_dep(Dep::new("mio", "^0.8").with_optional(true))
                    .with_feature("net", &["mio"]),
            )
            .with(IndexRecord::new("mio", "0.8.0"))
            .with(IndexRecord::new("log", "0.4.0"));
        let closure = closure_of(
            &index,
            &["app"],
            &ClosureOptions {
                optional: OptionalDeps::Features,
                ..Default::default()
            },
        );
        assert_eq!(ids(&closure), vec!["app v1.0.0", "mio v0.8.0", "tokio v1.0.0"]);
        assert!(closure.features[&id("tokio", "1.0.0")].contains("net"));
    }

    #[test]
    fn growing_selection_only_adds() {
        let index = web_index().with(
            IndexRecord::new("tool", "0.1.0")
                .with_dep(Dep::new("log", "^0.4"))
                .with_dep(Dep::new("rand", "^0.8")),
        );
        let options = ClosureOptions::default();
        let small = closure_of(&index, &["app"], &options);
        let large = closure_of(&index, &["app", "tool"], &options);
        assert!(small.packages.is_subset(&large.packages));
        assert!(large.contains(&id("rand", "0.8.5")));
    }

    #[test]
    fn newer_prerelease_roots_stable_release_too() {
        let index = MemoryIndex::new()
            .with(IndexRecord::new("hyper", "0.14.28").with_dep(Dep::new("bytes", "^1")))
            .with(IndexRecord::new("hyper", "1.0.0-rc.4").with_dep(Dep::new("http", "^1")))
            .with(IndexRecord::new("bytes", "1.5.0"))
            .with(IndexRecord::new("http", "1.0.0"));
        let closure = closure_of(&index, &["hyper"], &ClosureOptions::default());
        assert_eq!(
            ids(&closure),
            vec!["bytes v1.5.0", "http v1.0.0", "hyper v0.14.28", "hyper v1.0.0-rc.4"]
        );
        assert_eq!(closure.roots.len(), 2);
    }

    #[test]
    fn prerelease_only_package_has_one_root() {
        let index = MemoryIndex::new()
            .with(IndexRecord::new("nightly", "0.1.0-alpha.1"))
            .with(IndexRecord::new("nightly", "0.1.0-alpha.2"));
        let closure = closure_of(&index, &["nightly"], &ClosureOptions::default());
        assert_eq!(ids(&closure), vec!["nightly v0.1.0-alpha.2"]);
        assert_eq!(closure.roots.len(), 1);
    }

    #[test]
    fn visit_order_does_not_matter() {
        let index = web_index().with(IndexRecord::new("tool", "0.1.0").with_dep(Dep::new("http", "^0.2")));
        let options = ClosureOptions::default();
        let forward = build_closure(&names(&["app", "tool"]), &index, &options);
        let backward = build_closure(&names(&["tool", "app"]), &index, &options);
        assert_eq!(forward.packages, backward.packages);
        assert_eq!(forward.edges, backward.edges);
    }
}
