//! Projects, workflows, runs and executions.
//!
//! These wrap a [`Record`] and expose typed accessors for the handful of
//! fields the engine relies on structurally. Everything else stays dynamic.

use crate::error::{Result, RunlensError};
use crate::record::{AsRecord, FieldValue, Record};
use crate::time::{self, MALFORMED_KEY, MISSING_KEY};
use chrono::{DateTime, Utc};
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Field names with structural meaning.
pub mod keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const PARENT_EXECUTION_ID: &str = "parentExecutionId";
    pub const SESSION_ID: &str = "sessionId";
    pub const EXECUTION_TS: &str = "executionTs";
    pub const CREATION_TS: &str = "creationTs";
    pub const INPUT: &str = "input";
    pub const SUB_EXECUTIONS: &str = "subExecutions";
    pub const DURATION: &str = "duration";
    pub const TOTAL_TOKENS: &str = "totalTokens";
    pub const RUNS: &str = "runs";
    pub const QUESTIONS: &str = "questions";
    pub const WORKFLOWS: &str = "workflows";
    pub const PROJECTS: &str = "projects";
    pub const MODEL: &str = "model";
    pub const PROMPT_VERSION: &str = "promptVersion";
    pub const TIMESTAMP: &str = "timestamp";
}

// ============================================================================
// Execution
// ============================================================================

/// One recorded evaluation attempt within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    id: String,
    record: Record,
}

impl Execution {
    /// Build an execution from a record. The `id` field is required.
    pub fn from_record(record: Record) -> Result<Self> {
        let id = record
            .get(keys::ID)
            .and_then(FieldValue::as_id)
            .ok_or(RunlensError::MissingField(keys::ID))?;
        Ok(Self { id, record })
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let record = Record::from_json(value)
            .ok_or_else(|| RunlensError::InvalidDataset("execution is not an object".into()))?;
        Self::from_record(record)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.record.get(key)
    }

    pub fn parent_execution_id(&self) -> Option<String> {
        self.record
            .get(keys::PARENT_EXECUTION_ID)
            .and_then(FieldValue::as_id)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.record
            .get_str(keys::SESSION_ID)
            .filter(|s| !s.is_empty())
    }

    pub fn input(&self) -> Option<&str> {
        self.record.get_str(keys::INPUT).filter(|s| !s.is_empty())
    }

    /// Earliest readable timestamp among `executionTs` and `creationTs`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_fields()
            .filter_map(time::field_timestamp)
            .min()
    }

    /// Chronological ordering key in epoch milliseconds.
    ///
    /// No timestamp at all reads as the epoch; timestamps that are present
    /// but unreadable read as the minimum key.
    pub fn timestamp_key(&self) -> i64 {
        let mut present = false;
        let mut earliest: Option<i64> = None;
        for value in self.timestamp_fields() {
            present = true;
            if let Some(dt) = time::field_timestamp(value) {
                let ms = dt.timestamp_millis();
                earliest = Some(earliest.map_or(ms, |e| e.min(ms)));
            }
        }
        match (present, earliest) {
            (_, Some(ms)) => ms,
            (true, None) => MALFORMED_KEY,
            (false, None) => MISSING_KEY,
        }
    }

    fn timestamp_fields(&self) -> impl Iterator<Item = &FieldValue> {
        [keys::EXECUTION_TS, keys::CREATION_TS]
            .into_iter()
            .filter_map(|k| self.record.get_present(k))
    }

    /// Ids of the nested child executions listed under `subExecutions`.
    pub fn sub_execution_ids(&self) -> Vec<String> {
        self.record
            .get(keys::SUB_EXECUTIONS)
            .and_then(FieldValue::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(FieldValue::as_record)
                    .filter_map(|r| r.get(keys::ID).and_then(FieldValue::as_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nested child executions. Children without an id are skipped.
    pub fn sub_executions(&self) -> Vec<Execution> {
        self.record
            .get(keys::SUB_EXECUTIONS)
            .and_then(FieldValue::as_list)
            .map(|items| executions_from_list(items, &self.id))
            .unwrap_or_default()
    }
}

impl AsRecord for Execution {
    fn as_record(&self) -> &Record {
        &self.record
    }
}

impl Serialize for Execution {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Execution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let record = Record::deserialize(deserializer)?;
        Execution::from_record(record).map_err(de::Error::custom)
    }
}

fn executions_from_list(items: &[FieldValue], owner: &str) -> Vec<Execution> {
    items
        .iter()
        .filter_map(|item| match item.as_record() {
            Some(record) => match Execution::from_record(record.clone()) {
                Ok(exec) => Some(exec),
                Err(e) => {
                    warn!(owner, error = %e, "skipping execution record");
                    None
                }
            },
            None => {
                warn!(owner, "skipping non-object execution entry");
                None
            }
        })
        .collect()
}

// ============================================================================
// Run
// ============================================================================

/// One versioned batch of executions.
///
/// The execution list is taken from the run's `runs` field, or `questions`
/// when `runs` is absent. It is removed from the run's own record.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    id: String,
    version: Option<String>,
    record: Record,
    executions: Vec<Execution>,
}

impl Run {
    pub fn from_record(mut record: Record) -> Result<Self> {
        let version = record.get(keys::VERSION).and_then(FieldValue::as_id);
        let id = record
            .get(keys::ID)
            .and_then(FieldValue::as_id)
            .or_else(|| version.clone())
            .ok_or(RunlensError::MissingField(keys::ID))?;

        let list = match record.remove(keys::RUNS) {
            Some(FieldValue::List(items)) => {
                record.remove(keys::QUESTIONS);
                items
            }
            _ => match record.remove(keys::QUESTIONS) {
                Some(FieldValue::List(items)) => items,
                _ => Vec::new(),
            },
        };
        let executions = executions_from_list(&list, &id);

        Ok(Self {
            id,
            version,
            record,
            executions,
        })
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let record = Record::from_json(value)
            .ok_or_else(|| RunlensError::InvalidDataset("run is not an object".into()))?;
        Self::from_record(record)
    }

    /// Assemble a run directly from parts.
    pub fn new(id: impl Into<String>, record: Record, executions: Vec<Execution>) -> Self {
        let version = record.get(keys::VERSION).and_then(FieldValue::as_id);
        Self {
            id: id.into(),
            version,
            record,
            executions,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The run version, falling back to the id.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(&self.id)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn find_execution(&self, id: &str) -> Option<&Execution> {
        self.executions.iter().find(|e| e.id() == id)
    }
}

impl AsRecord for Run {
    fn as_record(&self) -> &Record {
        &self.record
    }
}

// ============================================================================
// Workflow & Project
// ============================================================================

/// A named collection of runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    id: String,
    record: Record,
    runs: Vec<Run>,
}

impl Workflow {
    pub fn from_record(mut record: Record) -> Result<Self> {
        let id = record
            .get(keys::ID)
            .and_then(FieldValue::as_id)
            .ok_or(RunlensError::MissingField(keys::ID))?;
        let runs = match record.remove(keys::RUNS) {
            Some(FieldValue::List(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    FieldValue::Object(r) => Run::from_record(r)
                        .map_err(|e| warn!(workflow = %id, error = %e, "skipping run record"))
                        .ok(),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(Self { id, record, runs })
    }

    pub fn new(id: impl Into<String>, runs: Vec<Run>) -> Self {
        let id = id.into();
        let mut record = Record::new();
        record.insert(keys::ID, id.clone());
        Self { id, record, runs }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.record.get_str(keys::NAME).unwrap_or(&self.id)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn find_run(&self, id: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.id() == id)
    }
}

impl AsRecord for Workflow {
    fn as_record(&self) -> &Record {
        &self.record
    }
}

/// A project groups the workflows the analyst can browse.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    id: String,
    name: Option<String>,
    workflows: Vec<Workflow>,
}

impl Project {
    pub fn from_record(mut record: Record) -> Result<Self> {
        let id = record
            .get(keys::ID)
            .and_then(FieldValue::as_id)
            .unwrap_or_else(|| "default".to_string());
        let name = record.get_str(keys::NAME).map(str::to_string);
        let workflows = match record.remove(keys::WORKFLOWS) {
            Some(FieldValue::List(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    FieldValue::Object(r) => Workflow::from_record(r)
                        .map_err(|e| warn!(project = %id, error = %e, "skipping workflow record"))
                        .ok(),
                    _ => None,
                })
                .collect(),
            _ => return Err(RunlensError::MissingField(keys::WORKFLOWS)),
        };
        Ok(Self {
            id,
            name,
            workflows,
        })
    }

    pub fn new(id: impl Into<String>, workflows: Vec<Workflow>) -> Self {
        Self {
            id: id.into(),
            name: None,
            workflows,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn find_workflow(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id() == id)
    }

    /// Locate a run anywhere in the project by id.
    pub fn find_run(&self, run_id: &str) -> Option<(&Workflow, &Run)> {
        self.workflows
            .iter()
            .find_map(|w| w.find_run(run_id).map(|r| (w, r)))
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// The materialized records supplied by the data-fetch layer.
///
/// Accepts either `{"projects": [...]}` or a single project object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    projects: Vec<Project>,
}

impl Dataset {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RunlensError::DatasetNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let mut record = Record::from_json(value)
            .ok_or_else(|| RunlensError::InvalidDataset("top level is not an object".into()))?;
        let projects = match record.remove(keys::PROJECTS) {
            Some(FieldValue::List(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    FieldValue::Object(r) => Project::from_record(r)
                        .map_err(|e| warn!(error = %e, "skipping project record"))
                        .ok(),
                    _ => None,
                })
                .collect(),
            _ if record.contains_key(keys::WORKFLOWS) => vec![Project::from_record(record)?],
            _ => {
                return Err(RunlensError::InvalidDataset(
                    "expected `projects` or `workflows`".into(),
                ))
            }
        };
        Ok(Self { projects })
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn find_workflow(&self, id: &str) -> Option<(&Project, &Workflow)> {
        self.projects
            .iter()
            .find_map(|p| p.find_workflow(id).map(|w| (p, w)))
    }

    pub fn find_run(&self, run_id: &str) -> Option<(&Project, &Workflow, &Run)> {
        self.projects
            .iter()
            .find_map(|p| p.find_run(run_id).map(|(w, r)| (p, w, r)))
    }
}
