//! Runs command handler.
//!
//! Lists the runs of one workflow with their aggregated metrics, filtered by
//! a free-text query and exact-match facets and sorted by any column.

use super::{find_workflow, load_dataset};
use crate::config::{load_global_config, TableSettings};
use crate::error::Result;
use crate::metrics::{format_score, summarize_run, AVG_PREFIX};
use crate::model::{keys, Dataset};
use crate::output::{print_count, print_header, print_table, GRAY, RESET};
use crate::record::{FieldValue, Record};
use crate::schema::{title_label, ColumnDescriptor};
use crate::table::{unique_values, RunFacets, SortConfig, SortDirection, TableState};
use std::path::Path;
use tracing::debug;

/// Columns shown before the per-metric averages.
const BASE_COLUMNS: &[(&str, &str)] = &[
    (keys::ID, "ID"),
    (keys::VERSION, "Version"),
    (keys::MODEL, "Model"),
    (keys::PROMPT_VERSION, "Prompt Version"),
    ("avgScore", "Avg Score"),
    ("questionCount", "Questions"),
    ("avgDuration", "Avg Duration"),
    (keys::TOTAL_TOKENS, "Tokens"),
];

/// Options of the `runs` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunsOptions {
    pub workflow: String,
    /// Sort key; the configured default when absent.
    pub sort: Option<String>,
    pub descending: bool,
    pub search: Option<String>,
    pub facets: RunFacets,
}

impl RunsOptions {
    fn table_state(&self, settings: &TableSettings) -> TableState {
        let mut state = TableState::new(settings.sort_config());
        if let Some(key) = &self.sort {
            state.sort = SortConfig::ascending(key.as_str());
        }
        if self.descending {
            state.sort.direction = SortDirection::Descending;
        }
        if let Some(query) = &self.search {
            state.set_query(query.as_str());
        }
        state
    }
}

/// Print the run listing of a workflow.
pub fn runs_command(path: &Path, options: &RunsOptions) -> Result<()> {
    let dataset = load_dataset(path)?;
    let config = load_global_config()?;
    let listing = run_listing(&dataset, options, &config.table)?;

    print_header(&listing.title);
    if listing.rows.is_empty() {
        if listing.total == 0 {
            println!("{GRAY}No runs in this workflow.{RESET}");
        } else {
            println!("{GRAY}No runs match the current search and filters.{RESET}");
        }
    } else {
        print_table(&listing.columns, &listing.rows);
    }
    println!();
    if !listing.models.is_empty() {
        println!("{GRAY}Models: {}{RESET}", listing.models.join(", "));
    }
    print_count(listing.rows.len(), "run");
    Ok(())
}

/// A rendered run listing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunListing {
    pub title: String,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<String>>,
    /// Runs in the workflow before filtering.
    pub total: usize,
    /// Distinct models, for narrowing with `--model`.
    pub models: Vec<String>,
}

pub(crate) fn run_listing(
    dataset: &Dataset,
    options: &RunsOptions,
    settings: &TableSettings,
) -> Result<RunListing> {
    let workflow = find_workflow(dataset, &options.workflow)?;
    let summaries: Vec<Record> = workflow.runs().iter().map(summarize_run).collect();
    let state = options.table_state(settings);
    debug!(
        workflow = workflow.id(),
        sort = %state.sort.key,
        direction = %state.sort.direction,
        query = %state.query,
        "building run listing"
    );

    let faceted = options.facets.apply(&summaries);
    let visible = state.process(&faceted, None);
    let columns = listing_columns(&summaries);
    let rows = visible
        .iter()
        .map(|row| columns.iter().map(|c| render_cell(row, &c.key)).collect())
        .collect();

    Ok(RunListing {
        title: format!("Runs of {}", workflow.name()),
        total: summaries.len(),
        models: unique_values(&summaries, keys::MODEL),
        columns,
        rows,
    })
}

fn listing_columns(summaries: &[Record]) -> Vec<ColumnDescriptor> {
    let mut columns: Vec<ColumnDescriptor> = BASE_COLUMNS
        .iter()
        .map(|(key, label)| ColumnDescriptor::new(*key, *label))
        .collect();
    for summary in summaries {
        for key in summary.keys() {
            if let Some(metric) = key.strip_prefix(AVG_PREFIX) {
                if !columns.iter().any(|c| c.key == key) {
                    columns.push(ColumnDescriptor::new(key, title_label(metric)));
                }
            }
        }
    }
    columns
}

fn render_cell(row: &Record, key: &str) -> String {
    match (key, row.get_present(key)) {
        ("avgScore", value) => format_score(value.and_then(FieldValue::as_numeric)),
        (_, Some(value)) => value.display_string(),
        (_, None) => "-".to_string(),
    }
}
