//! Configuration to selection to closure.

use tracing::info;

use topcrates_index::IndexSource;

use crate::closure::{build_closure, Closure};
use crate::config::Config;
use crate::error::{MirrorError, Result};
use crate::selection::{cookbook_dependencies, select, Selection, SelectionRequest};
use crate::stats::DownloadStats;

/// Command-line narrowing of the configuration.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Only these configured categories take part; empty keeps all.
    pub categories: Vec<String>,
    /// Replaces the configured target triples when non-empty.
    pub targets: Vec<String>,
}

/// What a run would mirror.
#[derive(Debug, Clone)]
pub struct Plan {
    pub selection: Selection,
    pub closure: Closure,
}

/// Select packages and compute their closure.
///
/// Fails on configuration problems: an unreadable statistics file when
/// rankings are configured, an unreadable cookbook manifest, or an unknown
/// target triple.
pub fn plan(config: &Config, filters: &Filters, index: &dyn IndexSource) -> Result<Plan> {
    let options = config.closure_options(&filters.targets)?;

    let stats = if config.needs_stats() {
        DownloadStats::load(&config.stats_path())?
    } else {
        DownloadStats::default()
    };

    let cookbook = if config.cookbook {
        let path = config.cookbook_manifest();
        let manifest = std::fs::read_to_string(&path).map_err(|e| MirrorError::Config {
            path: path.clone(),
            detail: format!("cannot read cookbook manifest: {e}"),
        })?;
        cookbook_dependencies(&manifest).map_err(|e| MirrorError::Config {
            path,
            detail: e.to_string(),
        })?
    } else {
        Vec::new()
    };
    info!(
        ranked = stats.len(),
        cookbook = cookbook.len(),
        "selection inputs loaded"
    );

    let request =
        SelectionRequest::from_config(config, cookbook)?.only_categories(&filters.categories);
    let selection = select(&request, &stats, index);
    let closure = build_closure(&selection.names, index, &options);
    Ok(Plan { selection, closure })
}
