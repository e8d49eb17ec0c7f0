//! Columns command handler.
//!
//! Shows the columns discovered for a listing: workflows, the runs of one
//! workflow, or the executions of one run.

use super::{find_run, find_workflow, load_dataset};
use crate::error::Result;
use crate::metrics::summarize_run;
use crate::model::Dataset;
use crate::output::{print_count, print_header, print_table, GRAY, RESET};
use crate::record::Record;
use crate::schema::{discover_columns, discover_fields, ColumnDescriptor};
use std::path::Path;

/// Which listing to discover columns for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnScope<'a> {
    Workflows,
    Runs { workflow: &'a str },
    Executions { run: &'a str },
}

impl<'a> ColumnScope<'a> {
    fn from_args(workflow: Option<&'a str>, run: Option<&'a str>) -> Self {
        match (run, workflow) {
            (Some(run), _) => ColumnScope::Executions { run },
            (None, Some(workflow)) => ColumnScope::Runs { workflow },
            (None, None) => ColumnScope::Workflows,
        }
    }
}

/// Print the discovered columns of a listing.
///
/// `--run` takes precedence over `--workflow`. Without either, the workflow
/// listing is described.
pub fn columns_command(path: &Path, workflow: Option<&str>, run: Option<&str>) -> Result<()> {
    let dataset = load_dataset(path)?;
    let scope = ColumnScope::from_args(workflow, run);
    let (title, header, rows) = column_table(&dataset, scope)?;

    print_header(&title);
    if rows.is_empty() {
        println!("{GRAY}No records to discover columns from.{RESET}");
        return Ok(());
    }
    print_table(&header, &rows);
    println!();
    print_count(rows.len(), "column");
    Ok(())
}

pub(crate) fn column_table(
    dataset: &Dataset,
    scope: ColumnScope<'_>,
) -> Result<(String, Vec<ColumnDescriptor>, Vec<Vec<String>>)> {
    match scope {
        ColumnScope::Workflows => {
            let sample: Vec<&Record> = dataset
                .projects()
                .iter()
                .flat_map(|p| p.workflows())
                .map(|w| w.record())
                .collect();
            Ok((
                "Workflow columns".to_string(),
                key_label_header(),
                key_label_rows(&discover_columns(&sample)),
            ))
        }
        ColumnScope::Runs { workflow } => {
            let workflow = find_workflow(dataset, workflow)?;
            let sample: Vec<Record> = workflow.runs().iter().map(summarize_run).collect();
            Ok((
                format!("Run columns of {}", workflow.name()),
                key_label_header(),
                key_label_rows(&discover_columns(&sample)),
            ))
        }
        ColumnScope::Executions { run } => {
            let (_, run) = find_run(dataset, run)?;
            let rows = discover_fields(run.executions())
                .into_iter()
                .map(|field| vec![field.key, field.label, field.kind.name().to_string()])
                .collect();
            Ok((
                format!("Execution fields of {}", run.id()),
                vec![
                    ColumnDescriptor::new("key", "Key"),
                    ColumnDescriptor::new("label", "Label"),
                    ColumnDescriptor::new("kind", "Kind"),
                ],
                rows,
            ))
        }
    }
}

fn key_label_header() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("key", "Key"),
        ColumnDescriptor::new("label", "Label"),
    ]
}

fn key_label_rows(columns: &[ColumnDescriptor]) -> Vec<Vec<String>> {
    columns
        .iter()
        .map(|c| vec![c.key.clone(), c.label.clone()])
        .collect()
}
