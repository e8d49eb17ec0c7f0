//! Session grouping and parent/child trees over flat execution lists.
//!
//! Every function here is pure. Dangling references and unreadable timestamps
//! degrade to roots and sentinel ordering keys; nothing is ever rejected.

use crate::model::Execution;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Placeholder shown when a session's earliest execution has no input.
pub const NO_INPUT: &str = "No input";

/// Collapse repeated ids to one entry each.
///
/// An id keeps the position of its first occurrence and the contents of its
/// last one, so a re-fetched execution replaces the stale copy in place.
pub fn dedupe(executions: &[Execution]) -> Vec<Execution> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<Execution> = Vec::new();
    for exec in executions {
        match positions.get(exec.id()) {
            Some(&pos) => unique[pos] = exec.clone(),
            None => {
                positions.insert(exec.id(), unique.len());
                unique.push(exec.clone());
            }
        }
    }
    unique
}

/// Session an execution belongs to, synthesized from its id when absent.
pub fn session_id_for(execution: &Execution) -> String {
    match execution.session_id() {
        Some(id) => id.to_string(),
        None => format!("exec_{}", execution.id()),
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// A conversation: the executions sharing one session id.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGroup {
    pub session_id: String,
    /// Chronological, earliest first.
    pub executions: Vec<Execution>,
    /// Mean of every scored value in the session, pooled across metrics.
    pub avg_score: f64,
    pub message_count: usize,
    pub first_message: String,
    /// Timestamp of the earliest execution, if readable.
    pub timestamp: Option<DateTime<Utc>>,
}

impl SessionGroup {
    /// Ordering key of the session, taken from its earliest execution.
    pub fn timestamp_key(&self) -> i64 {
        self.executions
            .first()
            .map(Execution::timestamp_key)
            .unwrap_or(crate::time::MISSING_KEY)
    }
}

/// Mean of every scored value across the given executions, 0 when none.
pub fn pooled_score(executions: &[Execution]) -> f64 {
    let (sum, count) = executions
        .iter()
        .flat_map(|exec| exec.record().iter())
        .filter_map(|(_, value)| value.as_scored())
        .filter(|scored| !scored.value.is_nan())
        .fold((0.0, 0usize), |(sum, count), scored| (sum + scored.value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Group executions into sessions, most recent session first.
pub fn build_sessions(executions: &[Execution]) -> Vec<SessionGroup> {
    let unique = dedupe(executions);

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Execution>> = HashMap::new();
    for exec in unique {
        let session_id = session_id_for(&exec);
        groups
            .entry(session_id.clone())
            .or_insert_with(|| {
                order.push(session_id);
                Vec::new()
            })
            .push(exec);
    }

    let mut sessions: Vec<SessionGroup> = order
        .into_iter()
        .filter_map(|session_id| {
            let mut execs = groups.remove(&session_id)?;
            execs.sort_by_key(Execution::timestamp_key);

            let first = execs.first()?;
            let first_message = first.input().unwrap_or(NO_INPUT).to_string();
            let timestamp = first.timestamp();

            Some(SessionGroup {
                avg_score: pooled_score(&execs),
                message_count: execs.len(),
                first_message,
                timestamp,
                session_id,
                executions: execs,
            })
        })
        .collect();

    sessions.sort_by(|a, b| b.timestamp_key().cmp(&a.timestamp_key()));
    sessions
}

// ============================================================================
// Trees
// ============================================================================

/// An execution with the executions that name it as their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionNode {
    pub execution: Execution,
    pub children: Vec<ExecutionNode>,
}

impl ExecutionNode {
    /// Number of executions in this subtree, this one included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ExecutionNode::len).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first search for an execution by id.
    pub fn find(&self, id: &str) -> Option<&ExecutionNode> {
        if self.execution.id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Rebuild parent/child trees from `parentExecutionId` references.
///
/// Executions whose parent is missing from the list, or is themselves, are
/// roots. A parent cycle is broken by promoting its first member in input
/// order to a root. Roots and children keep input order.
pub fn build_tree(executions: &[Execution]) -> Vec<ExecutionNode> {
    let unique = dedupe(executions);
    let index: HashMap<&str, usize> = unique
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id(), i))
        .collect();

    let mut parents: Vec<Option<usize>> = unique
        .iter()
        .map(|exec| {
            let parent_id = exec.parent_execution_id()?;
            match index.get(parent_id.as_str()) {
                Some(&p) if unique[p].id() != exec.id() => Some(p),
                Some(_) => {
                    debug!(execution = exec.id(), "self-referencing parent, treating as root");
                    None
                }
                None => {
                    debug!(execution = exec.id(), parent = %parent_id, "dangling parent, treating as root");
                    None
                }
            }
        })
        .collect();

    for start in 0..unique.len() {
        if in_cycle(&parents, start) {
            debug!(execution = unique[start].id(), "parent cycle, promoting to root");
            parents[start] = None;
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); unique.len()];
    let mut roots = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    roots
        .into_iter()
        .map(|root| assemble(root, &unique, &children))
        .collect()
}

/// Whether following parent links from `start` leads back to `start`.
fn in_cycle(parents: &[Option<usize>], start: usize) -> bool {
    let mut visited = HashSet::new();
    let mut current = parents[start];
    while let Some(node) = current {
        if node == start {
            return true;
        }
        if !visited.insert(node) {
            return false;
        }
        current = parents[node];
    }
    false
}

fn assemble(node: usize, executions: &[Execution], children: &[Vec<usize>]) -> ExecutionNode {
    ExecutionNode {
        execution: executions[node].clone(),
        children: children[node]
            .iter()
            .map(|&child| assemble(child, executions, children))
            .collect(),
    }
}
