//! Platform filters on dependency edges and the target allow-list.

use tracing::warn;

use crate::cfg::CfgExpr;
use crate::error::{Result, TargetError};
use crate::platform::DeploymentTarget;

/// The `target` field of a dependency: a cfg expression or a literal triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformFilter {
    Triple(String),
    Cfg(CfgExpr),
}

impl PlatformFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with("cfg(") {
            return Ok(PlatformFilter::Cfg(CfgExpr::parse(input)?));
        }
        if input.is_empty() || input.contains(char::is_whitespace) {
            return Err(TargetError::CfgParse {
                input: input.to_string(),
                position: 0,
                detail: "neither a cfg(...) expression nor a target triple".to_string(),
            });
        }
        Ok(PlatformFilter::Triple(input.to_string()))
    }

    pub fn matches(&self, target: &DeploymentTarget) -> bool {
        match self {
            PlatformFilter::Triple(triple) => *triple == target.triple,
            PlatformFilter::Cfg(expr) => expr.eval(target),
        }
    }
}

/// The set of targets a mirror is built for.
///
/// An empty set stands for every target: all platform-specific edges are
/// followed.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    targets: Vec<DeploymentTarget>,
}

impl TargetSet {
    /// Follow every edge regardless of platform.
    pub fn all() -> Self {
        TargetSet::default()
    }

    /// Resolve triples against custom definitions and the built-in table.
    pub fn from_triples<S: AsRef<str>>(
        triples: &[S],
        custom: &[DeploymentTarget],
    ) -> Result<Self> {
        let targets = triples
            .iter()
            .map(|t| DeploymentTarget::resolve(t.as_ref(), custom))
            .collect::<Result<Vec<_>>>()?;
        Ok(TargetSet { targets })
    }

    pub fn is_all(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[DeploymentTarget] {
        &self.targets
    }

    /// Whether an edge with the given platform filter should be followed.
    ///
    /// Unfiltered edges always are. A filter that cannot be parsed keeps
    /// the edge, so a closure is never narrowed by a syntax it doesn't know.
    pub fn allows(&self, filter: Option<&str>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        if self.is_all() {
            return true;
        }
        match PlatformFilter::parse(filter) {
            Ok(filter) => self.targets.iter().any(|t| filter.matches(t)),
            Err(e) => {
                warn!(filter = %filter, error = %e, "keeping edge with unparseable platform filter");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_triple_filter() {
        assert_eq!(
            PlatformFilter::parse("x86_64-pc-windows-gnu").unwrap(),
            PlatformFilter::Triple("x86_64-pc-windows-gnu".to_string())
        );
    }

    #[test]
    fn parse_cfg_filter() {
        assert!(matches!(
            PlatformFilter::parse(" cfg(windows) ").unwrap(),
            PlatformFilter::Cfg(_)
        ));
    }

    #[test]
    fn all_targets_follow_everything() {
        let set = TargetSet::all();
        assert!(set.allows(None));
        assert!(set.allows(Some("cfg(windows)")));
        assert!(set.allows(Some("wasm32-unknown-unknown")));
    }

    #[test]
    fn linux_only_skips_windows_edges() {
        let set = TargetSet::from_triples(&["x86_64-unknown-linux-gnu"], &[]).unwrap();
        assert!(set.allows(None));
        assert!(set.allows(Some("cfg(unix)")));
        assert!(!set.allows(Some("cfg(windows)")));
        assert!(!set.allows(Some("x86_64-pc-windows-msvc")));
        assert!(set.allows(Some("x86_64-unknown-linux-gnu")));
    }

    #[test]
    fn any_allowed_target_matches() {
        let set = TargetSet::from_triples(
            &["x86_64-unknown-linux-gnu", "x86_64-pc-windows-msvc"],
            &[],
        )
        .unwrap();
        assert!(set.allows(Some("cfg(windows)")));
        assert!(set.allows(Some("cfg(unix)")));
        assert!(!set.allows(Some(r#"cfg(target_os = "macos")"#)));
    }

    #[test]
    fn unparseable_filter_keeps_edge() {
        let set = TargetSet::from_triples(&["x86_64-unknown-linux-gnu"], &[]).unwrap();
        assert!(set.allows(Some("cfg(all(")));
    }

    #[test]
    fn unknown_triple_is_error() {
        assert!(TargetSet::from_triples(&["nope-nope-nope"], &[]).is_err());
    }
}
