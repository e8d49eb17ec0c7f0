//! Column and metric discovery for records without a fixed schema.
//!
//! Discovery is a pure function of its input sample. Callers recompute it only
//! when the sample itself changes; nothing here caches.

use crate::model::{keys, Execution};
use crate::record::{AsRecord, FieldValue};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A stable column key and its human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Columns every listing starts with, whatever the sample holds.
pub const LEADING_COLUMNS: &[(&str, &str)] = &[
    ("compare", "Compare Checkbox"),
    (keys::ID, "ID"),
    (keys::TIMESTAMP, "Timestamp"),
    (keys::MODEL, "Model"),
    (keys::PROMPT_VERSION, "Prompt Version"),
];

/// Top-level fields that are represented structurally, never as columns.
const EXCLUDED_FIELDS: &[&str] = &[
    "id",
    "ID",
    "baseID",
    keys::VERSION,
    keys::TIMESTAMP,
    keys::MODEL,
    keys::PROMPT_VERSION,
    keys::RUNS,
    keys::QUESTIONS,
    keys::SUB_EXECUTIONS,
    GROUND_TRUTH_FIELD,
    EXECUTION_DATA_FIELD,
];

const GROUND_TRUTH_FIELD: &str = "GroundTruthData";
const EXECUTION_DATA_FIELD: &str = "ExecutionData";

/// Sub-objects whose fields are flattened with a namespaced key and label.
const NAMESPACES: &[Namespace] = &[
    Namespace {
        field: GROUND_TRUTH_FIELD,
        key_prefix: "gt_",
        label_prefix: "GT",
    },
    Namespace {
        field: EXECUTION_DATA_FIELD,
        key_prefix: "exec_",
        label_prefix: "Exec",
    },
];

struct Namespace {
    field: &'static str,
    key_prefix: &'static str,
    label_prefix: &'static str,
}

/// Ordered, deduplicated column list accumulated during discovery.
#[derive(Default)]
struct ColumnSet {
    seen: HashSet<String>,
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    fn push(&mut self, key: String, label: String) {
        if self.seen.insert(key.clone()) {
            self.columns.push(ColumnDescriptor { key, label });
        }
    }
}

/// Discover the displayable columns of a record sample.
///
/// An empty sample yields no columns. Otherwise the fixed leading columns come
/// first, followed by every remaining field in first-seen order. Fields of the
/// ground-truth and execution sub-objects are emitted as `gt_<field>` and
/// `exec_<field>` with a `GT:` or `Exec:` label marker.
pub fn discover_columns<T: AsRecord>(sample: &[T]) -> Vec<ColumnDescriptor> {
    if sample.is_empty() {
        return Vec::new();
    }

    let mut set = ColumnSet::default();
    for (key, label) in LEADING_COLUMNS {
        set.push(key.to_string(), label.to_string());
    }

    for item in sample {
        let record = item.as_record();
        for key in record.keys() {
            if !EXCLUDED_FIELDS.contains(&key) {
                set.push(key.to_string(), format_label(key));
            }
        }
        for ns in NAMESPACES {
            let Some(nested) = record.get(ns.field).and_then(FieldValue::as_record) else {
                continue;
            };
            for key in nested.keys().filter(|k| *k != "ID") {
                set.push(
                    format!("{}{}", ns.key_prefix, key),
                    format!("{}: {}", ns.label_prefix, format_label(key)),
                );
            }
        }
    }

    set.columns
}

// ============================================================================
// Labels
// ============================================================================

/// Split a field name into words on case boundaries and underscores.
///
/// `outputScore` gives `output Score`, `HTTPStatus` gives `HTTP Status`,
/// `rag_relevancy` gives `rag relevancy`.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Column label: words joined by single spaces, first letter capitalized.
pub fn format_label(name: &str) -> String {
    capitalize(&split_words(name).join(" "))
}

/// Metric label: every word capitalized (`avg_latency_ms` gives `Avg Latency Ms`).
pub fn title_label(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Field discovery for the run detail table
// ============================================================================

/// How a discovered field should be rendered and sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Number,
    Metric,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "long text",
            FieldKind::Number => "number",
            FieldKind::Metric => "metric",
        }
    }
}

/// Text longer than this is treated as long-form content.
pub const LONG_TEXT_THRESHOLD: usize = 50;

/// Execution fields hidden from the detail table.
const DETAIL_SKIP_FIELDS: &[&str] = &[
    "runId",
    "workflowId",
    keys::PARENT_EXECUTION_ID,
    keys::CREATION_TS,
];

/// A discovered execution field with its rendering kind and display rank.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub order: u32,
}

impl FieldDescriptor {
    pub fn is_metric(&self) -> bool {
        self.kind == FieldKind::Metric
    }
}

/// Whether a field name reads like a quality metric.
pub fn is_metric_like_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["score", "rate", "accuracy", "metric"]
        .iter()
        .any(|token| lower.contains(token))
}

fn field_order(key: &str) -> u32 {
    match key {
        "id" => 0,
        "input" => 1,
        "expectedOutput" => 2,
        "output" => 3,
        "duration" => 100,
        "totalTokens" => 101,
        "executionTs" => 102,
        _ if is_metric_like_name(key) => 200,
        _ => 300,
    }
}

fn classify(value: &FieldValue) -> FieldKind {
    match value {
        FieldValue::Scored(_) => FieldKind::Metric,
        FieldValue::Number(_) => FieldKind::Number,
        FieldValue::Text(s) if s.chars().count() > LONG_TEXT_THRESHOLD => FieldKind::LongText,
        _ => FieldKind::Text,
    }
}

/// Discover every execution field for the detail table, ordered by rank.
///
/// The kind is taken from the first record defining the field, except that a
/// text field is upgraded to long text when any later record has a long value.
pub fn discover_fields(executions: &[Execution]) -> Vec<FieldDescriptor> {
    let mut fields: Vec<FieldDescriptor> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for exec in executions {
        for (key, value) in exec.record().iter() {
            if DETAIL_SKIP_FIELDS.contains(&key) {
                continue;
            }
            match positions.get(key) {
                Some(&i) => {
                    let existing = &mut fields[i];
                    if existing.kind == FieldKind::Text && classify(value) == FieldKind::LongText {
                        existing.kind = FieldKind::LongText;
                    }
                }
                None => {
                    positions.insert(key, fields.len());
                    fields.push(FieldDescriptor {
                        key: key.to_string(),
                        label: title_label(key),
                        kind: classify(value),
                        order: field_order(key),
                    });
                }
            }
        }
    }

    // stable: equal ranks keep first-seen order
    fields.sort_by_key(|f| f.order);
    fields
}

/// Discover the scored-metric fields of an execution sample.
pub fn discover_metric_fields(executions: &[Execution]) -> Vec<ColumnDescriptor> {
    let mut set = ColumnSet::default();
    for exec in executions {
        for (key, value) in exec.record().iter() {
            if matches!(value, FieldValue::Scored(_)) {
                set.push(key.to_string(), title_label(key));
            }
        }
    }
    set.columns
}

// ============================================================================
// Metric visibility
// ============================================================================

/// Which metric columns the analyst has chosen to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricVisibility {
    visible: BTreeSet<String>,
}

impl MetricVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show every discovered metric if nothing has been chosen yet.
    pub fn initialize(&mut self, fields: &[ColumnDescriptor]) {
        if self.visible.is_empty() {
            self.visible = fields.iter().map(|f| f.key.clone()).collect();
        }
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible.contains(key)
    }

    pub fn toggle(&mut self, key: &str) {
        if !self.visible.remove(key) {
            self.visible.insert(key.to_string());
        }
    }

    /// Select all metrics, or when all are already selected, keep only the
    /// first one visible.
    pub fn toggle_all(&mut self, fields: &[ColumnDescriptor]) {
        if self.visible.len() == fields.len() {
            self.visible = fields.iter().take(1).map(|f| f.key.clone()).collect();
        } else {
            self.visible = fields.iter().map(|f| f.key.clone()).collect();
        }
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
