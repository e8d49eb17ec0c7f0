//! Side-by-side comparison data: one question across runs, whole runs by
//! metric, and one conversation across runs.

use crate::hierarchy::{pooled_score, session_id_for};
use crate::metrics::infer_score_fields;
use crate::model::{keys, Execution, Run, Workflow};
use crate::record::{AsRecord, FieldValue};
use crate::schema::ColumnDescriptor;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Most versions that can be compared side by side.
pub const MAX_SELECTED_VERSIONS: usize = 2;

/// Percent change from `previous` to `current`, rounded to one decimal.
///
/// `None` when either side is missing, zero, or not a number.
pub fn score_delta(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let usable = |v: Option<f64>| v.filter(|v| !v.is_nan() && *v != 0.0);
    let (current, previous) = (usable(current)?, usable(previous)?);
    Some(((current - previous) / previous * 1000.0).round() / 10.0)
}

/// Average of an execution's scored values, 0 when it has none.
pub fn execution_score(execution: &Execution) -> f64 {
    pooled_score(std::slice::from_ref(execution))
}

// ============================================================================
// Question comparison
// ============================================================================

/// The execution at the compared position in one run.
#[derive(Debug, Clone, Copy)]
pub struct QuestionMatch<'a> {
    pub run: &'a Run,
    pub execution: &'a Execution,
}

impl QuestionMatch<'_> {
    pub fn version(&self) -> &str {
        self.run.version()
    }
}

/// One question followed across every run of a workflow.
///
/// Runs are matched by position: the execution at the base execution's index
/// in each run is taken as the same question.
#[derive(Debug, Clone)]
pub struct QuestionComparison<'a> {
    pub base: QuestionMatch<'a>,
    pub position: usize,
    /// First match per run version, in run order.
    pub matches: Vec<QuestionMatch<'a>>,
}

/// Locate `base_id` and collect the execution at its position in each run.
pub fn compare_question<'a>(runs: &'a [Run], base_id: &str) -> Option<QuestionComparison<'a>> {
    let (run, position) = runs.iter().find_map(|run| {
        run.executions()
            .iter()
            .position(|e| e.id() == base_id)
            .map(|pos| (run, pos))
    })?;
    let base = QuestionMatch {
        run,
        execution: &run.executions()[position],
    };

    let mut seen = HashSet::new();
    let matches = runs
        .iter()
        .filter_map(|run| {
            let execution = run.executions().get(position)?;
            seen.insert(run.version())
                .then_some(QuestionMatch { run, execution })
        })
        .collect();

    Some(QuestionComparison {
        base,
        position,
        matches,
    })
}

impl<'a> QuestionComparison<'a> {
    pub fn versions(&self) -> Vec<&'a str> {
        self.matches.iter().map(|m| m.run.version()).collect()
    }

    pub fn find(&self, version: &str) -> Option<&QuestionMatch<'a>> {
        self.matches.iter().find(|m| m.version() == version)
    }

    pub fn score_fields(&self) -> Vec<ColumnDescriptor> {
        infer_score_fields(self.matches.iter().map(|m| m.execution.as_record()))
    }

    /// Selected matches, ordered by execution time when both sides have one.
    pub fn selected(&self, selection: &VersionSelection) -> Vec<QuestionMatch<'a>> {
        let mut selected: Vec<QuestionMatch<'a>> = selection
            .versions()
            .iter()
            .filter_map(|v| self.find(v).copied())
            .collect();
        selected.sort_by(|a, b| {
            match (a.execution.timestamp(), b.execution.timestamp()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => std::cmp::Ordering::Equal,
            }
        });
        selected
    }
}

/// Versions picked for side-by-side comparison, oldest pick first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSelection {
    versions: Vec<String>,
}

impl VersionSelection {
    /// Start with `initial` selected when it is one of the `available` versions.
    pub fn new(initial: Option<&str>, available: &[&str]) -> Self {
        Self {
            versions: initial
                .filter(|v| available.contains(v))
                .map(|v| vec![v.to_string()])
                .unwrap_or_default(),
        }
    }

    /// Deselect a selected version, or select it, replacing the oldest pick
    /// when the selection is full.
    pub fn toggle(&mut self, version: &str) {
        if let Some(pos) = self.versions.iter().position(|v| v == version) {
            self.versions.remove(pos);
            return;
        }
        if self.versions.len() >= MAX_SELECTED_VERSIONS {
            self.versions.remove(0);
        }
        self.versions.push(version.to_string());
    }

    pub fn contains(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn is_full(&self) -> bool {
        self.versions.len() >= MAX_SELECTED_VERSIONS
    }

    pub fn clear(&mut self) {
        self.versions.clear();
    }
}

// ============================================================================
// Run comparison
// ============================================================================

/// Execution fields that never count as metrics (matched case-insensitively).
const NON_METRIC_FIELDS: &[&str] = &[
    "id",
    "input",
    "expected_output",
    "actual_output",
    "timestamp",
    "subexecutions",
    "workflowid",
    "parentexecutionid",
    "runid",
    "duration",
    "total_tokens",
    "execution_ts",
    "executionts",
    "sessionid",
    "created_at",
    "updated_at",
    "creation_ts",
    "creationts",
];

/// Mean of one metric over a run's executions.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricMean {
    pub key: String,
    pub mean: f64,
    /// Every observed value lies in `[0, 1]`.
    pub scaled: bool,
}

/// Per-metric means of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAggregate {
    pub run_id: String,
    pub version: String,
    pub execution_count: usize,
    pub metrics: Vec<MetricMean>,
}

impl RunAggregate {
    pub fn metric(&self, key: &str) -> Option<&MetricMean> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

fn is_metric_field(key: &str) -> bool {
    !NON_METRIC_FIELDS.contains(&key.to_lowercase().as_str())
}

fn metric_value(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Scored(scored) => Some(scored.value),
        FieldValue::Number(_) | FieldValue::Text(_) => value.as_numeric(),
        _ => None,
    }
}

/// Mean of every numeric or scored field across a run's executions.
pub fn aggregate_for_comparison(run: &Run) -> RunAggregate {
    // (key, sum, count, scaled)
    let mut totals: Vec<(String, f64, usize, bool)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for exec in run.executions() {
        for (key, value) in exec.record().iter() {
            if !is_metric_field(key) {
                continue;
            }
            let Some(n) = metric_value(value).filter(|n| !n.is_nan()) else {
                continue;
            };
            let in_range = (0.0..=1.0).contains(&n);
            match positions.get(key) {
                Some(&i) => {
                    let (_, sum, count, scaled) = &mut totals[i];
                    *sum += n;
                    *count += 1;
                    *scaled &= in_range;
                }
                None => {
                    positions.insert(key, totals.len());
                    totals.push((key.to_string(), n, 1, in_range));
                }
            }
        }
    }

    RunAggregate {
        run_id: run.id().to_string(),
        version: run.version().to_string(),
        execution_count: run.executions().len(),
        metrics: totals
            .into_iter()
            .map(|(key, sum, count, scaled)| MetricMean {
                key,
                mean: sum / count as f64,
                scaled,
            })
            .collect(),
    }
}

/// Aggregate the selected runs of a workflow, in selection order.
///
/// Ids that do not name a run of the workflow are skipped.
pub fn compare_runs(workflow: &Workflow, run_ids: &[String]) -> Vec<RunAggregate> {
    run_ids
        .iter()
        .filter_map(|id| {
            let run = workflow.find_run(id);
            if run.is_none() {
                debug!(workflow = workflow.id(), run = %id, "run not in workflow, skipping");
            }
            run
        })
        .map(aggregate_for_comparison)
        .collect()
}

/// Union of metric keys across aggregates, first-seen order.
pub fn metric_keys(aggregates: &[RunAggregate]) -> Vec<String> {
    let mut seen = HashSet::new();
    aggregates
        .iter()
        .flat_map(|a| a.metrics.iter())
        .filter(|m| seen.insert(m.key.clone()))
        .map(|m| m.key.clone())
        .collect()
}

// ============================================================================
// Conversation comparison
// ============================================================================

fn sort_chronologically(executions: &mut [Execution]) {
    executions.sort_by_key(Execution::timestamp_key);
}

/// Executions of one session within a run, earliest first.
pub fn session_executions(run: &Run, session_id: &str) -> Vec<Execution> {
    let mut executions: Vec<Execution> = run
        .executions()
        .iter()
        .filter(|e| session_id_for(e) == session_id)
        .cloned()
        .collect();
    sort_chronologically(&mut executions);
    executions
}

/// Start of the first contiguous run of executions whose inputs equal `inputs`.
fn find_input_sequence(executions: &[Execution], inputs: &[Option<&FieldValue>]) -> Option<usize> {
    if inputs.is_empty() || inputs.len() > executions.len() {
        return None;
    }
    executions.windows(inputs.len()).position(|window| {
        window
            .iter()
            .zip(inputs)
            .all(|(exec, input)| exec.get(keys::INPUT) == *input)
    })
}

/// The slice of a compared run that replays the base conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedSession {
    pub session_id: String,
    pub executions: Vec<Execution>,
}

/// One conversation followed across runs by its sequence of inputs.
#[derive(Debug, Clone)]
pub struct ConversationComparison<'a> {
    pub base_run: &'a Run,
    pub session_id: String,
    pub base: Vec<Execution>,
    /// Runs containing the same inputs in the same contiguous order.
    pub candidates: Vec<&'a Run>,
}

/// Collect the base session from the run with `base_version` and find every
/// run that replays it.
pub fn compare_conversation<'a>(
    runs: &'a [Run],
    base_version: &str,
    session_id: &str,
) -> Option<ConversationComparison<'a>> {
    let base_run = runs.iter().find(|r| r.version() == base_version)?;
    let base = session_executions(base_run, session_id);
    let inputs: Vec<Option<&FieldValue>> = base.iter().map(|e| e.get(keys::INPUT)).collect();
    let candidates = runs
        .iter()
        .filter(|run| find_input_sequence(run.executions(), &inputs).is_some())
        .collect();

    Some(ConversationComparison {
        base_run,
        session_id: session_id.to_string(),
        candidates,
        base,
    })
}

impl ConversationComparison<'_> {
    pub fn candidate_versions(&self) -> Vec<&str> {
        self.candidates.iter().map(|r| r.version()).collect()
    }

    /// The replayed slice of the candidate run with `version`, earliest first.
    pub fn matching_session(&self, version: &str) -> Option<MatchedSession> {
        let run = self.candidates.iter().find(|r| r.version() == version)?;
        let inputs: Vec<Option<&FieldValue>> = self.base.iter().map(|e| e.get(keys::INPUT)).collect();
        let start = find_input_sequence(run.executions(), &inputs)?;
        let mut executions = run.executions()[start..start + inputs.len()].to_vec();
        sort_chronologically(&mut executions);
        let session_id = session_id_for(executions.first()?);
        Some(MatchedSession {
            session_id,
            executions,
        })
    }

    /// Per-turn score difference (base minus compared), paired by position.
    pub fn score_deltas(&self, other: &MatchedSession) -> Vec<f64> {
        self.base
            .iter()
            .zip(&other.executions)
            .map(|(base, compared)| execution_score(base) - execution_score(compared))
            .collect()
    }
}
