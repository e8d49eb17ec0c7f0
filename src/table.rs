//! Field-agnostic sorting, searching and facet filtering for listings.
//!
//! Every listing (workflows, runs, executions, comparison rows) goes through
//! the same comparator and predicate. Inputs are never mutated; results are
//! fresh vectors.

use crate::record::{AsRecord, FieldValue};
use crate::time;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Keys that always compare numerically, whatever their runtime type.
const NUMERIC_KEYS: &[&str] = &["avgScore", "questionCount", "subworkflowCount", "messageCount"];

/// Keys that compare as parsed timestamps.
const TIMESTAMP_KEYS: &[&str] = &[
    "startTs",
    "finishTs",
    "createdAt",
    "updatedAt",
    "timestamp",
    "executionTs",
    "creationTs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "ascending"),
            SortDirection::Descending => write!(f, "descending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: String,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn ascending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Ascending)
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Descending)
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self::ascending("id")
    }
}

// ============================================================================
// Comparison
// ============================================================================

fn is_numeric_key(key: &str) -> bool {
    NUMERIC_KEYS.contains(&key) || key.starts_with(crate::metrics::AVG_PREFIX)
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Numeric order with NaN after every number.
fn cmp_numbers(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => cmp_f64(a, b),
    }
}

/// Ordering class of a value in a mixed-type column: numbers and scored
/// metrics, then booleans, then anything compared as text.
fn value_class(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Number(_) | FieldValue::Scored(_) => 0,
        FieldValue::Bool(_) => 1,
        _ => 2,
    }
}

fn cmp_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    value_class(a).cmp(&value_class(b)).then_with(|| match (a, b) {
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => cmp_numbers(x, y),
            _ => a
                .display_string()
                .to_lowercase()
                .cmp(&b.display_string().to_lowercase()),
        },
    })
}

/// Compare two records on `config.key`.
///
/// Missing and null values sort last in both directions. Numeric keys compare
/// by their lenient numeric reading and timestamp keys by parsed time. Any
/// other column may mix types: numbers and scored metrics come first in
/// numeric order (NaN last among them), then booleans, then everything else
/// as lowercase text.
pub fn compare<T: AsRecord + ?Sized>(a: &T, b: &T, config: &SortConfig) -> Ordering {
    let key = config.key.as_str();
    let (a, b) = match (a.as_record().get_present(key), b.as_record().get_present(key)) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };

    let ordering = if is_numeric_key(key) {
        cmp_f64(a.as_numeric().unwrap_or(0.0), b.as_numeric().unwrap_or(0.0))
    } else if TIMESTAMP_KEYS.contains(&key) {
        time::ordering_key(Some(a)).cmp(&time::ordering_key(Some(b)))
    } else {
        cmp_values(a, b)
    };
    config.direction.apply(ordering)
}

/// Stable sort into a new vector.
pub fn sort<T: AsRecord + Clone>(items: &[T], config: &SortConfig) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| compare(a, b, config));
    sorted
}

// ============================================================================
// Search
// ============================================================================

fn contains_query(value: &FieldValue, needle: &str) -> bool {
    !value.is_null() && value.display_string().to_lowercase().contains(needle)
}

/// Whether a record matches a case-insensitive substring query.
///
/// Without `keys` any field may match; with `keys` only the named fields are
/// searched. An empty query matches everything.
pub fn matches_query<T: AsRecord + ?Sized>(item: &T, query: &str, keys: Option<&[&str]>) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    let record = item.as_record();
    match keys {
        Some(keys) if !keys.is_empty() => keys
            .iter()
            .filter_map(|k| record.get(k))
            .any(|v| contains_query(v, &needle)),
        _ => record.iter().any(|(_, v)| contains_query(v, &needle)),
    }
}

/// Items matching `query`, in input order.
pub fn filter<T: AsRecord + Clone>(items: &[T], query: &str, keys: Option<&[&str]>) -> Vec<T> {
    items
        .iter()
        .filter(|item| matches_query(*item, query, keys))
        .cloned()
        .collect()
}

// ============================================================================
// Table state
// ============================================================================

/// Sort and search state of one listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub sort: SortConfig,
    pub query: String,
    default_sort: SortConfig,
}

impl TableState {
    pub fn new(default_sort: SortConfig) -> Self {
        Self {
            sort: default_sort.clone(),
            query: String::new(),
            default_sort,
        }
    }

    /// Column header click: a second click on an ascending column flips it to
    /// descending; any other click sorts ascending.
    pub fn handle_sort(&mut self, key: &str) {
        let direction = if self.sort.key == key && self.sort.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        self.sort = SortConfig::new(key, direction);
    }

    pub fn is_sorted(&self, key: &str) -> bool {
        self.sort.key == key
    }

    pub fn sort_direction_for(&self, key: &str) -> Option<SortDirection> {
        self.is_sorted(key).then_some(self.sort.direction)
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    pub fn has_active_search(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn reset(&mut self) {
        self.sort = self.default_sort.clone();
        self.query.clear();
    }

    /// Filter by the current query, then sort by the current config.
    pub fn process<T: AsRecord + Clone>(&self, items: &[T], keys: Option<&[&str]>) -> Vec<T> {
        sort(&filter(items, &self.query, keys), &self.sort)
    }
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(SortConfig::default())
    }
}

// ============================================================================
// Run facets
// ============================================================================

/// Exact-match filters over run listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFacets {
    pub model: Option<String>,
    pub prompt_version: Option<String>,
    pub version: Option<String>,
}

impl RunFacets {
    pub fn is_active(&self) -> bool {
        self.model.is_some() || self.prompt_version.is_some() || self.version.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches<T: AsRecord + ?Sized>(&self, item: &T) -> bool {
        let record = item.as_record();
        [
            (crate::model::keys::MODEL, &self.model),
            (crate::model::keys::PROMPT_VERSION, &self.prompt_version),
            (crate::model::keys::VERSION, &self.version),
        ]
        .into_iter()
        .all(|(key, wanted)| match wanted {
            None => true,
            Some(wanted) => record
                .get_present(key)
                .is_some_and(|v| v.display_string() == *wanted),
        })
    }

    pub fn apply<T: AsRecord + Clone>(&self, items: &[T]) -> Vec<T> {
        items.iter().filter(|item| self.matches(*item)).cloned().collect()
    }
}

/// Sorted distinct non-empty values of `key`, for facet pickers.
pub fn unique_values<T: AsRecord>(items: &[T], key: &str) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.as_record().get_present(key))
        .map(FieldValue::display_string)
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
