//! CLI command handlers for runlens.
//!
//! Each command loads a dataset file, runs one engine operation over it and
//! prints the result as a table.
//!
//! # Commands
//!
//! - [`columns`] - Discovered columns of a listing
//! - [`runs`] - Sorted, filtered run listing of a workflow
//! - [`sessions`] - Conversation sessions of one run
//! - [`metrics`] - Aggregated metrics of one run
//! - [`compare`] - Per-metric means of several runs side by side
//! - [`config`] - Effective configuration

mod columns;
mod compare;
mod config;
mod metrics;
mod runs;
mod sessions;

pub use columns::columns_command;
pub use compare::compare_command;
pub use config::{config_display_command, config_reset_command};
pub use metrics::metrics_command;
pub use runs::{runs_command, RunsOptions};
pub use sessions::sessions_command;

use crate::error::{Result, RunlensError};
use crate::model::{Dataset, Run, Workflow};
use std::path::Path;
use tracing::info;

/// Load a dataset file, logging what was found.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let dataset = Dataset::load(path)?;
    info!(
        path = %path.display(),
        projects = dataset.projects().len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Find a workflow by id in any project.
pub fn find_workflow<'a>(dataset: &'a Dataset, id: &str) -> Result<&'a Workflow> {
    dataset
        .find_workflow(id)
        .map(|(_, workflow)| workflow)
        .ok_or_else(|| RunlensError::NotFound {
            kind: "workflow",
            id: id.to_string(),
        })
}

/// Find a run by id in any workflow of any project.
pub fn find_run<'a>(dataset: &'a Dataset, id: &str) -> Result<(&'a Workflow, &'a Run)> {
    dataset
        .find_run(id)
        .map(|(_, workflow, run)| (workflow, run))
        .ok_or_else(|| RunlensError::NotFound {
            kind: "run",
            id: id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_dataset;
    use tempfile::TempDir;

    #[test]
    fn test_find_workflow_and_run() {
        let data = sample_dataset();
        assert_eq!(find_workflow(&data, "w1").unwrap().name(), "Answering");
        let (workflow, run) = find_run(&data, "r1").unwrap();
        assert_eq!((workflow.id(), run.id()), ("w1", "r1"));
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let data = sample_dataset();
        let err = find_workflow(&data, "nope").unwrap_err();
        assert_eq!(err.to_string(), "No workflow found matching `nope`");
        assert!(matches!(
            find_run(&data, "nope"),
            Err(RunlensError::NotFound { kind: "run", .. })
        ));
    }

    #[test]
    fn test_load_dataset_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        std::fs::write(&path, r#"{"workflows": [{"id": "w", "runs": []}]}"#).unwrap();
        let data = load_dataset(&path).unwrap();
        assert_eq!(data.projects().len(), 1);

        let missing = temp.path().join("missing.json");
        assert!(matches!(
            load_dataset(&missing),
            Err(RunlensError::DatasetNotFound(_))
        ));
    }
}
