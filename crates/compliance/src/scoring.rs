//! Status resolution and auto-fix eligibility.

use crate::types::{BrandRule, Severity, ValidationStatus};

/// Confidence below which a result can never pass.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Map a completed (score, confidence) pair onto a status. Pure function of
/// its inputs.
pub fn resolve_status(
    score: f64,
    confidence: f64,
    severity: Severity,
    tolerance: f64,
) -> ValidationStatus {
    if confidence < MIN_CONFIDENCE {
        ValidationStatus::Warning
    } else if score >= tolerance {
        ValidationStatus::Pass
    } else if score >= tolerance * 0.5 {
        ValidationStatus::Warning
    } else if severity == Severity::Error {
        ValidationStatus::Error
    } else {
        ValidationStatus::Fail
    }
}

/// Status for `rule` given its configured severity and tolerance.
pub fn resolve_for_rule(rule: &BrandRule, score: f64, confidence: f64) -> ValidationStatus {
    resolve_status(
        score,
        confidence,
        rule.severity,
        rule.configuration.tolerance,
    )
}

/// Only color, typography, and spacing have an automated correction.
pub fn auto_fix_available(rule: &BrandRule, score: f64) -> bool {
    rule.configuration.auto_fix
        && score < rule.configuration.tolerance
        && rule.category.supports_auto_fix()
}
