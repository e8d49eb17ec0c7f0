//! Dynamically shaped records.
//!
//! Evaluation data has no fixed schema: every workflow names its own metrics.
//! A [`Record`] is an insertion-ordered list of named [`FieldValue`]s, and a
//! scored metric (`{"value": 0.8, "reason": "..."}`) is recognized once, at
//! conversion time, as [`FieldValue::Scored`] so that downstream code can
//! pattern-match instead of probing for a `value` key.

use regex::Regex;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Leading numeric prefix, the same text a lenient float parser would accept.
static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?").expect("valid numeric regex")
});

/// A metric value paired with the evaluator's explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMetric {
    pub value: f64,
    pub reason: Option<String>,
}

/// A single field value in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Scored(ScoredMetric),
    Object(Record),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Convert a JSON value, recognizing scored metrics.
    ///
    /// An object is a scored metric when it has a `value` key holding a number
    /// or a numeric string. Anything else shaped like an object stays an
    /// [`FieldValue::Object`].
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null),
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from_json).collect())
            }
            Value::Object(map) => match scored_from_map(&map) {
                Some(scored) => FieldValue::Scored(scored),
                None => FieldValue::Object(Record::from_json_map(map)),
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Scored(scored) => {
                let mut map = Map::new();
                map.insert("value".to_string(), number_to_json(scored.value));
                if let Some(reason) = &scored.reason {
                    map.insert("reason".to_string(), Value::String(reason.clone()));
                }
                Value::Object(map)
            }
            FieldValue::Object(record) => record.to_json(),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric value of a plain number or a scored metric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Scored(scored) => Some(scored.value),
            _ => None,
        }
    }

    /// Lenient numeric reading: numbers, scored metrics, and text with a
    /// leading number (`"12.5s"` reads as `12.5`).
    pub fn as_numeric(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Text(s) => parse_leading_f64(s),
            other => other.as_number(),
        };
        n.filter(|n| !n.is_nan())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scored(&self) -> Option<&ScoredMetric> {
        match self {
            FieldValue::Scored(scored) => Some(scored),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Object(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Identifier reading: text as-is, whole numbers without a fraction.
    pub fn as_id(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) if !s.is_empty() => Some(s.clone()),
            FieldValue::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    /// Text used for searching and for the fallback string ordering.
    ///
    /// Scored metrics render as their numeric value; nested objects and lists
    /// render as compact JSON.
    pub fn display_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Scored(scored) => format_number(scored.value),
            FieldValue::Object(_) | FieldValue::List(_) => self.to_json().to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

fn scored_from_map(map: &Map<String, Value>) -> Option<ScoredMetric> {
    let value = match map.get("value")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let reason = map.get("reason").and_then(|r| match r {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    });
    Some(ScoredMetric { value, reason })
}

fn number_to_json(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Format a number the way it would be shown in a table cell: whole numbers
/// without a trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse the leading number of a string, ignoring any trailing text.
pub fn parse_leading_f64(s: &str) -> Option<f64> {
    let m = NUMERIC_PREFIX.find(s)?;
    m.as_str().trim().parse::<f64>().ok()
}

/// An insertion-ordered mapping of field name to [`FieldValue`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
    index: HashMap<String, usize>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_map(map: Map<String, Value>) -> Self {
        map.into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect()
    }

    /// Convert a JSON object. Returns `None` for any other JSON shape.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_json_map(map)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.index.get(key).map(|&i| &self.fields[i].1)
    }

    /// Non-null value for `key`.
    pub fn get_present(&self, key: &str) -> Option<&FieldValue> {
        self.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or replace a field. A replaced field keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&i) => self.fields[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.fields.len());
                self.fields.push((key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.fields.remove(idx);
        for (k, _) in &self.fields[idx..] {
            if let Some(i) = self.index.get_mut(k) {
                *i -= 1;
            }
        }
        Some(value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Record::from_json_map(map))
    }
}

/// Anything that exposes its fields as a [`Record`].
///
/// The listing helpers in [`crate::table`] are generic over this trait so one
/// comparator and one predicate serve runs, executions and summary rows alike.
pub trait AsRecord {
    fn as_record(&self) -> &Record;
}

impl AsRecord for Record {
    fn as_record(&self) -> &Record {
        self
    }
}

impl<T: AsRecord + ?Sized> AsRecord for &T {
    fn as_record(&self) -> &Record {
        (**self).as_record()
    }
}
