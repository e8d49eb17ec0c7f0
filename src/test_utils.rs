//! Test utilities shared across modules.
//!
//! Fixture builders that turn `serde_json::json!` literals into the record
//! types the engine works on. They panic on malformed fixtures, which is the
//! behavior a test wants.

use crate::model::{Dataset, Execution, Project, Run, Workflow};
use crate::record::Record;
use serde_json::{json, Value};

/// Build a bare record from a JSON object literal.
pub fn record(value: Value) -> Record {
    Record::from_json(value).expect("fixture must be a JSON object")
}

/// Build an execution from a JSON object literal carrying an `id`.
pub fn execution(value: Value) -> Execution {
    Execution::from_json(value).expect("fixture execution must have an id")
}

/// Build many executions at once.
pub fn executions(values: Vec<Value>) -> Vec<Execution> {
    values.into_iter().map(execution).collect()
}

/// Build a run from a JSON object literal (executions under `runs`).
pub fn run(value: Value) -> Run {
    Run::from_json(value).expect("fixture run must have an id or version")
}

/// Build a workflow holding the given runs.
pub fn workflow(id: &str, runs: Vec<Run>) -> Workflow {
    Workflow::new(id, runs)
}

/// Build a project holding the given workflows.
pub fn project(id: &str, workflows: Vec<Workflow>) -> Project {
    Project::new(id, workflows)
}

/// Build a dataset from a JSON literal.
pub fn dataset(value: Value) -> Dataset {
    Dataset::from_json(value).expect("fixture dataset must hold projects or workflows")
}

/// One project, one workflow `w1`, two runs with scored and session data.
pub fn sample_dataset() -> Dataset {
    dataset(json!({
        "projects": [{
            "id": "p1",
            "name": "Support bot",
            "workflows": [{
                "id": "w1",
                "name": "Answering",
                "runs": [
                    {
                        "id": "r1",
                        "version": "v1",
                        "model": "small",
                        "promptVersion": "p1",
                        "runs": [
                            {"id": "e1", "sessionId": "s1", "input": "hi",
                             "executionTs": "2025-01-01T10:00:00Z",
                             "outputScore": {"value": 0.5, "reason": "partial"},
                             "duration": 2.0, "totalTokens": 100},
                            {"id": "e2", "sessionId": "s1", "input": "bye",
                             "executionTs": "2025-01-01T10:01:00Z",
                             "outputScore": {"value": 1.0},
                             "duration": 4.0, "totalTokens": 300}
                        ]
                    },
                    {
                        "id": "r2",
                        "version": "v2",
                        "model": "large",
                        "promptVersion": "p1",
                        "runs": [
                            {"id": "e3", "sessionId": "s9", "input": "hi",
                             "executionTs": "2025-02-01T10:00:00Z",
                             "outputScore": {"value": 0.9},
                             "duration": 1.0, "totalTokens": 50}
                        ]
                    }
                ]
            }]
        }]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_builders() {
        let r = run(json!({"id": "r1", "version": "v1", "runs": [{"id": "e1"}]}));
        assert_eq!(r.executions().len(), 1);
        let p = project("p", vec![workflow("w", vec![r])]);
        assert!(p.find_run("r1").is_some());
    }

    #[test]
    fn test_sample_dataset_shape() {
        let data = sample_dataset();
        let (_, workflow, run) = data.find_run("r2").unwrap();
        assert_eq!(workflow.id(), "w1");
        assert_eq!(run.version(), "v2");
        assert_eq!(workflow.runs().len(), 2);
    }

    #[test]
    #[should_panic]
    fn test_execution_fixture_requires_id() {
        execution(json!({"input": "no id"}));
    }
}
