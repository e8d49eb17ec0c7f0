//! Metrics command handler.

use super::{find_run, load_dataset};
use crate::error::Result;
use crate::metrics::{aggregate_run, format_score, format_tokens, RunMetrics};
use crate::output::{print_header, print_table, BLUE, GRAY, RESET};
use crate::record::FieldValue;
use crate::schema::ColumnDescriptor;
use std::path::Path;

/// Print the aggregated metrics of one run.
pub fn metrics_command(path: &Path, run_id: &str) -> Result<()> {
    let dataset = load_dataset(path)?;
    let (workflow, run) = find_run(&dataset, run_id)?;
    let metrics = aggregate_run(run);

    print_header(&format!("Metrics of {} ({})", run.id(), run.version()));
    println!("{BLUE}Workflow:{RESET}   {}", workflow.name());
    for (label, value) in summary_lines(&metrics) {
        println!("{BLUE}{label}{RESET} {value}");
    }
    println!();

    let rows = metric_rows(&metrics);
    if rows.is_empty() {
        println!("{GRAY}No score fields found.{RESET}");
    } else {
        print_table(
            &[
                ColumnDescriptor::new("metric", "Metric"),
                ColumnDescriptor::new("average", "Average"),
            ],
            &rows,
        );
    }
    Ok(())
}

fn summary_lines(metrics: &RunMetrics) -> [(&'static str, String); 3] {
    [
        ("Avg score:", format_score(metrics.avg_score)),
        ("Duration: ", metrics.duration.clone().unwrap_or_else(|| "-".to_string())),
        ("Tokens:   ", format_tokens(metrics.total_tokens)),
    ]
}

fn metric_rows(metrics: &RunMetrics) -> Vec<Vec<String>> {
    metrics
        .score_fields
        .iter()
        .map(|field| {
            let average = metrics
                .metric(&field.key)
                .map(FieldValue::display_string)
                .unwrap_or_else(|| "-".to_string());
            vec![field.label.clone(), average]
        })
        .collect()
}
