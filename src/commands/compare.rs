//! Compare command handler.
//!
//! Shows per-metric means of several runs of one workflow side by side.

use super::{find_workflow, load_dataset};
use crate::comparison::{compare_runs, metric_keys, RunAggregate};
use crate::error::{Result, RunlensError};
use crate::model::Dataset;
use crate::output::{print_header, print_table, print_warning};
use crate::schema::{title_label, ColumnDescriptor};
use std::path::Path;

/// Print a metric-by-run comparison table.
pub fn compare_command(path: &Path, workflow_id: &str, run_ids: &[String]) -> Result<()> {
    let dataset = load_dataset(path)?;
    let aggregates = run_comparison(&dataset, workflow_id, run_ids)?;
    if aggregates.len() < run_ids.len() {
        print_warning(&format!(
            "{} of {} runs were not found in {}",
            run_ids.len() - aggregates.len(),
            run_ids.len(),
            workflow_id
        ));
    }

    print_header(&format!("Run comparison in {}", workflow_id));
    let (columns, rows) = comparison_table(&aggregates);
    print_table(&columns, &rows);
    Ok(())
}

pub(crate) fn run_comparison(
    dataset: &Dataset,
    workflow_id: &str,
    run_ids: &[String],
) -> Result<Vec<RunAggregate>> {
    let workflow = find_workflow(dataset, workflow_id)?;
    let aggregates = compare_runs(workflow, run_ids);
    if aggregates.is_empty() {
        return Err(RunlensError::NotFound {
            kind: "run",
            id: run_ids.join(", "),
        });
    }
    Ok(aggregates)
}

/// One row per metric, one column per run. Scaled metrics render as percent.
pub(crate) fn comparison_table(aggregates: &[RunAggregate]) -> (Vec<ColumnDescriptor>, Vec<Vec<String>>) {
    let mut columns = vec![ColumnDescriptor::new("metric", "Metric")];
    columns.extend(aggregates.iter().map(|a| {
        ColumnDescriptor::new(
            a.run_id.clone(),
            format!("{} ({})", a.version, a.execution_count),
        )
    }));

    let rows = metric_keys(aggregates)
        .into_iter()
        .map(|key| {
            let mut row = vec![title_label(&key)];
            row.extend(aggregates.iter().map(|a| match a.metric(&key) {
                Some(m) if m.scaled => format!("{:.1}%", m.mean * 100.0),
                Some(m) => format!("{:.2}", m.mean),
                None => "-".to_string(),
            }));
            row
        })
        .collect();
    (columns, rows)
}
