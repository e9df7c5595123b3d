//! Auto-fix batch: apply corrections to eligible failing results, up to a cap.

use async_trait::async_trait;
use brand_core::{BrandError, BrandIdentity, BrandResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::extract;
use crate::types::{BrandRule, Criteria, ValidationResult, ValidationStatus};

/// A single property change proposed for an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub asset_id: String,
    pub rule_id: String,
    pub field: String,
    pub from: Value,
    pub to: Value,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixError {
    pub asset_id: String,
    pub rule_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoFixSummary {
    pub eligible: usize,
    pub attempted: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<FixError>,
    pub corrections: Vec<Correction>,
}

/// The correction call. Assets are never mutated by the validator itself.
#[async_trait]
pub trait AssetCorrector: Send + Sync {
    async fn correct(
        &self,
        violation: &ValidationResult,
        rule: &BrandRule,
        brand: &BrandIdentity,
    ) -> BrandResult<Correction>;
}

/// Proposes setting the category's primary field to the brand value.
pub struct ExpectedValueCorrector;

#[async_trait]
impl AssetCorrector for ExpectedValueCorrector {
    async fn correct(
        &self,
        violation: &ValidationResult,
        rule: &BrandRule,
        brand: &BrandIdentity,
    ) -> BrandResult<Correction> {
        let field = extract::primary_field(rule.category).ok_or_else(|| {
            BrandError::Correction(format!(
                "no automated correction for {} rules",
                rule.category.as_str()
            ))
        })?;

        let mut target = if violation.expected_value.is_null() {
            extract::expected_value(brand, rule)
        } else {
            violation.expected_value.clone()
        };
        if target.is_null() {
            if let Criteria::Range { min, max, .. } = &rule.criteria {
                target = json!((min + max) / 2.0);
            }
        }
        if target.is_null() {
            return Err(BrandError::Correction(format!(
                "brand '{}' defines no {} value",
                brand.id,
                rule.category.as_str()
            )));
        }

        Ok(Correction {
            asset_id: violation.asset_id().to_string(),
            rule_id: rule.id.clone(),
            field: field.to_string(),
            from: violation.actual_value.clone(),
            to: target,
            applied_at: Utc::now(),
        })
    }
}

/// Whether `result` is a candidate for the auto-fix batch.
pub fn is_eligible(result: &ValidationResult, rule: &BrandRule) -> bool {
    result.status == ValidationStatus::Fail
        && result.auto_fix_available
        && rule.configuration.auto_fix
}

/// Attempt corrections for eligible results in order, stopping at `cap`.
/// A failed correction is recorded and the batch continues.
pub async fn run_batch(
    results: &[ValidationResult],
    rules: &[BrandRule],
    brand: &BrandIdentity,
    corrector: &dyn AssetCorrector,
    cap: usize,
) -> AutoFixSummary {
    let eligible: Vec<(&ValidationResult, &BrandRule)> = results
        .iter()
        .filter_map(|result| {
            rules
                .iter()
                .find(|rule| rule.id == result.rule_id)
                .filter(|rule| is_eligible(result, rule))
                .map(|rule| (result, rule))
        })
        .collect();

    let mut summary = AutoFixSummary {
        eligible: eligible.len(),
        ..Default::default()
    };

    for (violation, rule) in eligible.into_iter().take(cap) {
        summary.attempted += 1;
        match corrector.correct(violation, rule, brand).await {
            Ok(correction) => {
                summary.successful += 1;
                summary.corrections.push(correction);
            }
            Err(e) => {
                warn!(rule_id = %rule.id, asset_id = %violation.asset_id(), error = %e, "auto-fix failed");
                summary.failed += 1;
                summary.errors.push(FixError {
                    asset_id: violation.asset_id().to_string(),
                    rule_id: rule.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        eligible = summary.eligible,
        attempted = summary.attempted,
        successful = summary.successful,
        failed = summary.failed,
        "auto-fix batch complete"
    );
    summary
}
