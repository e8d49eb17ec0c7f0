//! Derived run statistics: per-metric averages, overall score, duration and
//! token usage.
//!
//! Precomputed run-level values are used when no executions are supplied.
//! Missing data never fails: averages are omitted, the overall score and
//! duration become `None`, and token usage defaults to 0.

use crate::model::{keys, Execution, Run};
use crate::record::{format_number, parse_leading_f64, AsRecord, FieldValue, Record};
use crate::schema::{title_label, ColumnDescriptor};
use serde::Serialize;
use std::collections::HashSet;

/// Prefix of precomputed per-metric averages (`avg_outputScore`).
pub const AVG_PREFIX: &str = "avg_";

/// Fields that carry cost data rather than quality scores.
const NON_SCORE_FIELDS: &[&str] = &[keys::DURATION, keys::TOTAL_TOKENS];

/// Name tokens that mark a plain `[0, 1]` number as a score.
const SCORE_NAME_TOKENS: &[&str] = &["score", "rate", "accuracy"];

/// Aggregated statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub score_fields: Vec<ColumnDescriptor>,
    /// `avg_<field>` to the two-decimal average (or the run's own value).
    pub metrics: Record,
    /// Mean of the per-field averages; `None` when there are none.
    pub avg_score: Option<f64>,
    /// Mean execution duration such as `"1.5s"`; `None` without data.
    pub duration: Option<String>,
    /// Mean execution token usage; 0 without data.
    pub total_tokens: u64,
}

impl RunMetrics {
    pub fn metric(&self, field: &str) -> Option<&FieldValue> {
        self.metrics.get(&avg_key(field))
    }
}

pub fn avg_key(field: &str) -> String {
    format!("{AVG_PREFIX}{field}")
}

/// Aggregate a run from its executions, with optional caller-declared schema.
///
/// A non-empty `known_score_fields` replaces inference and a non-empty
/// `known_metrics` replaces computation.
pub fn aggregate(
    run: &Record,
    executions: &[Execution],
    known_score_fields: &[ColumnDescriptor],
    known_metrics: &Record,
) -> RunMetrics {
    let score_fields = if known_score_fields.is_empty() {
        if executions.is_empty() {
            infer_score_fields([run])
        } else {
            infer_score_fields(executions.iter().map(AsRecord::as_record))
        }
    } else {
        known_score_fields.to_vec()
    };

    let metrics = if known_metrics.is_empty() {
        compute_metrics(run, executions, &score_fields)
    } else {
        known_metrics.clone()
    };

    let avg_score = mean(
        score_fields
            .iter()
            .filter_map(|field| metrics.get(&avg_key(&field.key)))
            .filter_map(FieldValue::as_numeric),
    );

    RunMetrics {
        avg_score,
        duration: aggregate_duration(run, executions),
        total_tokens: aggregate_tokens(run, executions),
        score_fields,
        metrics,
    }
}

/// Aggregate a run over its own executions with inferred schema.
pub fn aggregate_run(run: &Run) -> RunMetrics {
    aggregate(run.record(), run.executions(), &[], &Record::new())
}

/// Listing row for a run: its own fields plus the aggregated values.
///
/// Adds `avgScore`, `questionCount`, `totalTokens`, `avgDuration` and every
/// computed `avg_<field>` so listings can sort and filter on them.
pub fn summarize_run(run: &Run) -> Record {
    let computed = aggregate_run(run);
    let mut row = run.record().clone();
    row.insert(keys::ID, run.id());
    if row.get(keys::VERSION).is_none() {
        row.insert(keys::VERSION, run.version());
    }
    for (key, value) in computed.metrics.iter() {
        row.insert(key, value.clone());
    }
    row.insert(
        "avgScore",
        computed.avg_score.map_or(FieldValue::Null, FieldValue::Number),
    );
    let question_count = row
        .get_present("questionCount")
        .and_then(FieldValue::as_numeric)
        .unwrap_or(run.executions().len() as f64);
    row.insert("questionCount", question_count);
    row.insert(keys::TOTAL_TOKENS, computed.total_tokens as f64);
    row.insert(
        "avgDuration",
        computed.duration.map_or(FieldValue::Null, FieldValue::Text),
    );
    row
}

// ============================================================================
// Score fields
// ============================================================================

fn is_score_field(key: &str, value: &FieldValue) -> bool {
    if key.starts_with(AVG_PREFIX) || matches!(value, FieldValue::Scored(_)) {
        return true;
    }
    match value {
        FieldValue::Number(n) if (0.0..=1.0).contains(n) => {
            let lower = key.to_lowercase();
            SCORE_NAME_TOKENS.iter().any(|t| lower.contains(t))
        }
        _ => false,
    }
}

/// Infer score fields from a record sample, prefix-stripped and deduplicated.
pub fn infer_score_fields<'a>(sample: impl IntoIterator<Item = &'a Record>) -> Vec<ColumnDescriptor> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for record in sample {
        for (key, value) in record.iter() {
            if NON_SCORE_FIELDS.contains(&key) || !is_score_field(key, value) {
                continue;
            }
            let name = key.strip_prefix(AVG_PREFIX).unwrap_or(key);
            if seen.insert(name.to_string()) {
                fields.push(ColumnDescriptor::new(name, title_label(name)));
            }
        }
    }
    fields
}

// ============================================================================
// Averages
// ============================================================================

/// Numeric value of a field that is a number or a scored metric.
fn wrapped_number(value: Option<&FieldValue>) -> Option<f64> {
    value.and_then(FieldValue::as_number).filter(|n| !n.is_nan())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn compute_metrics(run: &Record, executions: &[Execution], fields: &[ColumnDescriptor]) -> Record {
    let mut metrics = Record::new();
    if executions.is_empty() {
        for field in fields {
            let key = avg_key(&field.key);
            if let Some(value) = run.get(&key) {
                metrics.insert(key, value.clone());
            }
        }
        return metrics;
    }

    for field in fields {
        let avg = mean(executions.iter().filter_map(|e| wrapped_number(e.get(&field.key))));
        if let Some(avg) = avg {
            metrics.insert(avg_key(&field.key), format!("{avg:.2}"));
        }
    }
    metrics
}

fn aggregate_duration(run: &Record, executions: &[Execution]) -> Option<String> {
    if !executions.is_empty() {
        return mean(executions.iter().filter_map(|e| wrapped_number(e.get(keys::DURATION))))
            .map(|avg| format!("{avg:.1}s"));
    }
    match run.get(keys::DURATION)? {
        FieldValue::Text(s) => Some(s.clone()),
        other => other.as_number().map(|n| format!("{n:.1}s")),
    }
}

fn aggregate_tokens(run: &Record, executions: &[Execution]) -> u64 {
    let tokens = if executions.is_empty() {
        match run.get(keys::TOTAL_TOKENS) {
            Some(FieldValue::Text(s)) => parse_leading_f64(s),
            Some(other) => other.as_number(),
            None => None,
        }
    } else {
        mean(executions.iter().filter_map(|e| wrapped_number(e.get(keys::TOTAL_TOKENS))))
    };
    tokens
        .filter(|t| t.is_finite() && *t > 0.0)
        .map_or(0, |t| t.round() as u64)
}

/// Human-readable score with two decimals, or `-` when absent.
pub fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.2}"))
}

/// Token count without a trailing fraction.
pub fn format_tokens(tokens: u64) -> String {
    format_number(tokens as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{executions, record, run};
    use serde_json::json;

    fn none() -> Record {
        Record::new()
    }

    // ========================================================================
    // Score fields and averages
    // ========================================================================

    #[test]
    fn test_scored_values_average_to_two_decimals() {
        let execs = executions(vec![
            json!({"id": "1", "outputScore": {"value": 0.8, "reason": "ok"}}),
            json!({"id": "2", "outputScore": {"value": 0.6, "reason": "ok"}}),
        ]);
        let result = aggregate(&none(), &execs, &[], &none());
        assert_eq!(result.metrics.get_str("avg_outputScore"), Some("0.70"));
        assert_eq!(result.score_fields[0].label, "Output Score");
        assert!((result.avg_score.unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_inference_rules() {
        let execs = executions(vec![json!({
            "id": "1",
            "accuracy": 0.9,
            "hitRate": 0.4,
            "tokenScore": 7,
            "latency": 0.2,
            "avg_relevance": 0.5,
            "duration": 0.3,
            "faithfulness": {"value": 1, "reason": ""}
        })]);
        let result = aggregate(&none(), &execs, &[], &none());
        let keys: Vec<&str> = result.score_fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["accuracy", "hitRate", "relevance", "faithfulness"]);
    }

    #[test]
    fn test_fields_without_values_are_omitted() {
        let execs = executions(vec![json!({"id": "1", "x": {"value": 0.5}})]);
        let declared = vec![ColumnDescriptor::new("x", "X"), ColumnDescriptor::new("y", "Y")];
        let result = aggregate(&none(), &execs, &declared, &none());
        assert!(result.metric("x").is_some());
        assert!(result.metric("y").is_none());
        assert_eq!(result.score_fields, declared);
    }

    #[test]
    fn test_known_metrics_used_verbatim() {
        let known = record(json!({"avg_x": "0.33"}));
        let declared = vec![ColumnDescriptor::new("x", "X")];
        let execs = executions(vec![json!({"id": "1", "x": {"value": 1.0}})]);
        let result = aggregate(&none(), &execs, &declared, &known);
        assert_eq!(result.metrics, known);
        assert!((result.avg_score.unwrap() - 0.33).abs() < 1e-9);
    }

    #[test]
    fn test_run_level_averages_without_executions() {
        let run_record = record(json!({"avg_accuracy": 0.75, "avg_recall": null, "duration": 12.24}));
        let result = aggregate(&run_record, &[], &[], &none());
        assert_eq!(result.metrics.get("avg_accuracy"), Some(&FieldValue::Number(0.75)));
        assert_eq!(result.metrics.get("avg_recall"), Some(&FieldValue::Null));
        assert_eq!(result.avg_score, Some(0.75));
        assert_eq!(result.duration.as_deref(), Some("12.2s"));
    }

    #[test]
    fn test_zero_score_is_not_missing() {
        let execs = executions(vec![json!({"id": "1", "x": {"value": 0.0}})]);
        let result = aggregate(&none(), &execs, &[], &none());
        assert_eq!(result.avg_score, Some(0.0));
    }

    // ========================================================================
    // Duration and tokens
    // ========================================================================

    #[test]
    fn test_empty_inputs_keep_asymmetric_sentinels() {
        let result = aggregate(&none(), &[], &[], &none());
        assert_eq!(result.total_tokens, 0);
        assert_eq!(result.duration, None);
        assert_eq!(result.avg_score, None);
        assert!(result.metrics.is_empty());
    }

    #[test]
    fn test_duration_and_tokens_from_executions() {
        let execs = executions(vec![
            json!({"id": "1", "duration": 1.0, "totalTokens": 100}),
            json!({"id": "2", "duration": {"value": 2.0}, "totalTokens": 201}),
            json!({"id": "3", "duration": "slow"}),
        ]);
        let result = aggregate(&none(), &execs, &[], &none());
        assert_eq!(result.duration.as_deref(), Some("1.5s"));
        assert_eq!(result.total_tokens, 151);
    }

    #[test]
    fn test_run_duration_string_reused() {
        let run_record = record(json!({"duration": "3m 2s", "totalTokens": "1200"}));
        let result = aggregate(&run_record, &[], &[], &none());
        assert_eq!(result.duration.as_deref(), Some("3m 2s"));
        assert_eq!(result.total_tokens, 1200);
    }

    #[test]
    fn test_executions_without_duration() {
        let execs = executions(vec![json!({"id": "1"})]);
        let result = aggregate(&record(json!({"duration": 4})), &execs, &[], &none());
        assert_eq!(result.duration, None);
        assert_eq!(result.total_tokens, 0);
    }

    // ========================================================================
    // Listing rows
    // ========================================================================

    #[test]
    fn test_summarize_run_adds_aggregates() {
        let r = run(json!({
            "id": "r1",
            "version": "v1",
            "runs": [
                {"id": "e1", "score": {"value": 1.0}, "totalTokens": 10},
                {"id": "e2", "score": {"value": 0.5}, "totalTokens": 20}
            ]
        }));
        let row = summarize_run(&r);
        assert_eq!(row.get_str("avg_score"), Some("0.75"));
        assert_eq!(row.get("avgScore"), Some(&FieldValue::Number(0.75)));
        assert_eq!(row.get("questionCount"), Some(&FieldValue::Number(2.0)));
        assert_eq!(row.get("totalTokens"), Some(&FieldValue::Number(15.0)));
        assert_eq!(row.get("avgDuration"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_score(None), "-");
        assert_eq!(format_score(Some(0.456)), "0.46");
        assert_eq!(format_tokens(1500), "1500");
    }
}
