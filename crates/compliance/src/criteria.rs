//! Deterministic criteria evaluators (exact-match, range, pattern) and the
//! deviation measure shared by every criteria type.

use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};

use crate::types::Criteria;

/// Raw score/confidence pair produced by a criteria evaluator, before the
/// status resolver labels it.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionOutcome {
    pub score: f64,
    pub confidence: f64,
    pub details: Value,
}

impl CriterionOutcome {
    pub fn new(score: f64, confidence: f64, details: Value) -> Self {
        Self {
            score: clamp_score(score),
            confidence: clamp_confidence(confidence),
            details,
        }
    }
}

pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// String form used for comparisons and pattern tests.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize(value: &str, case_sensitive: bool) -> String {
    let trimmed = value.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Numeric coercion: numbers pass through, strings are parsed after
/// stripping the criteria unit (e.g. `"16px"` with unit `px`).
pub fn to_number(value: &Value, unit: Option<&str>) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let mut text = s.trim();
            if let Some(u) = unit.filter(|u| !u.is_empty()) {
                text = text.strip_suffix(u).unwrap_or(text).trim_end();
            }
            text.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Exact-match: passes when the actual value equals the expected value, or
/// is one of `allowed_values` when that list is non-empty.
pub fn evaluate_exact_match(
    actual: &Value,
    expected: &Value,
    allowed_values: &[String],
    case_sensitive: bool,
) -> CriterionOutcome {
    let actual_norm = normalize(&stringify(actual), case_sensitive);
    let matched = if allowed_values.is_empty() {
        !expected.is_null() && actual_norm == normalize(&stringify(expected), case_sensitive)
    } else {
        allowed_values
            .iter()
            .any(|v| normalize(v, case_sensitive) == actual_norm)
    };

    CriterionOutcome::new(
        if matched { 100.0 } else { 0.0 },
        1.0,
        json!({ "matched": matched, "case_sensitive": case_sensitive }),
    )
}

/// Range: scores proximity to the expected value inside `[min, max]`.
/// A missing or non-numeric expectation uses the range midpoint.
pub fn evaluate_range(
    actual: &Value,
    expected: &Value,
    min: f64,
    max: f64,
    unit: Option<&str>,
) -> CriterionOutcome {
    let Some(actual_num) = to_number(actual, unit) else {
        return CriterionOutcome::new(
            0.0,
            1.0,
            json!({ "error": "actual value is not numeric", "actual": actual }),
        );
    };

    let expected_num = to_number(expected, unit).unwrap_or((min + max) / 2.0);
    let span = max - min;
    let in_range = actual_num >= min && actual_num <= max;
    let score = if in_range {
        (100.0 - ((actual_num - expected_num).abs() / span) * 100.0)
            .max(0.0)
            .round()
    } else {
        0.0
    };

    CriterionOutcome::new(
        score,
        1.0,
        json!({
            "actual": actual_num,
            "expected": expected_num,
            "min": min,
            "max": max,
            "unit": unit,
            "in_range": in_range,
        }),
    )
}

/// Compile a pattern with JavaScript-style flag letters (`i`, `m`, `s`, `x`).
/// Unknown flags such as `g` are accepted and ignored.
pub fn compile_pattern(regex: &str, flags: &str) -> Result<Regex, regex::Error> {
    let mut builder = RegexBuilder::new(regex);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            _ => {}
        }
    }
    builder.build()
}

pub fn evaluate_pattern(actual: &Value, pattern: &Regex) -> CriterionOutcome {
    let text = stringify(actual);
    let matched = pattern.is_match(&text);
    CriterionOutcome::new(
        if matched { 100.0 } else { 0.0 },
        1.0,
        json!({ "matched": matched, "pattern": pattern.as_str() }),
    )
}

/// Normalized 0–100 distance between actual and expected for the criteria
/// that produced `outcome`.
pub fn deviation(
    criteria: &Criteria,
    actual: &Value,
    expected: &Value,
    outcome: &CriterionOutcome,
) -> f64 {
    match criteria {
        Criteria::ExactMatch { .. } => {
            if outcome.score >= 100.0 {
                0.0
            } else {
                100.0
            }
        }
        Criteria::Range { min, max, unit } => {
            let unit = unit.as_deref();
            match to_number(actual, unit) {
                Some(a) => {
                    let e = to_number(expected, unit).unwrap_or((min + max) / 2.0);
                    ((a - e).abs() / (max - min) * 100.0).clamp(0.0, 100.0)
                }
                None => 100.0,
            }
        }
        Criteria::Pattern { .. } | Criteria::Custom { .. } | Criteria::AiAnalysis { .. } => {
            if values_equal(actual, expected) {
                0.0
            } else {
                50.0
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
        _ => a == b,
    }
}
