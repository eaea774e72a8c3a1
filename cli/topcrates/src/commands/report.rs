//! `topcrates report`: show the selection and closure without writing.

use anyhow::{Context, Result};

use topcrates_index::FsIndex;
use topcrates_mirror::report::{format_closure, format_omissions, format_selection, format_tree};
use topcrates_mirror::{plan, ClosureSummary, Config, Filters};

pub fn run(config: &Config, filters: &Filters, tree: bool, json: bool) -> Result<()> {
    print!("{}", render(config, filters, tree, json)?);
    Ok(())
}

pub(crate) fn render(config: &Config, filters: &Filters, tree: bool, json: bool) -> Result<String> {
    let index_dir = config.index_dir();
    let index = FsIndex::open(&index_dir).with_context(|| {
        format!(
            "opening index at {} (run `topcrates update` first)",
            index_dir.display()
        )
    })?;
    let plan = plan(config, filters, &index)?;

    if json {
        let summary = ClosureSummary::new(&plan.selection, &plan.closure);
        return Ok(summary.to_json()? + "\n");
    }

    let mut out = format_selection(&plan.selection);
    out.push('\n');
    if tree {
        out.push_str(&format_tree(&plan.closure));
    } else {
        out.push_str(&format_closure(&plan.closure));
    }
    out.push_str(&format_omissions(&plan.closure.omissions));
    Ok(out)
}
