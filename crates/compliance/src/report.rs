//! Compliance report aggregation: overview, per-category breakdown, and
//! certifications.

use brand_core::config::ComplianceConfig;
use brand_core::ValidationContext;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::recommendations;
use crate::types::{
    BrandRule, CategoryBreakdown, Certification, ComplianceLevel, ComplianceOverview,
    ComplianceReport, ImpactTier, ReportLevel, RiskLevel, RuleCategory, ValidationResult,
    ValidationStatus,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn tally<'a>(results: impl IntoIterator<Item = &'a ValidationResult>) -> Self {
        let mut counts = Self::default();
        for r in results {
            match r.status {
                ValidationStatus::Pass => counts.passed += 1,
                ValidationStatus::Fail => counts.failed += 1,
                ValidationStatus::Warning => counts.warnings += 1,
                ValidationStatus::Error => counts.errors += 1,
                ValidationStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Results that count toward the score. Skipped rules do not.
    pub fn scored(&self) -> usize {
        self.passed + self.failed + self.warnings + self.errors
    }

    /// `round(passed / scored * 100)`, zero when nothing was scored.
    pub fn score(&self) -> u32 {
        let total = self.scored();
        if total == 0 {
            0
        } else {
            (self.passed as f64 / total as f64 * 100.0).round() as u32
        }
    }
}

/// Everything the aggregator needs from a finished pass.
pub struct PassOutcome<'a> {
    pub brand_id: &'a str,
    pub context: &'a ValidationContext,
    pub total_assets: usize,
    pub rules: &'a [BrandRule],
    pub results: Vec<ValidationResult>,
    pub started_at: DateTime<Utc>,
}

pub fn build_report(outcome: PassOutcome<'_>, config: &ComplianceConfig) -> ComplianceReport {
    let completed_at = Utc::now();
    let counts = StatusCounts::tally(&outcome.results);
    let overall_score = counts.score();

    let overview = ComplianceOverview {
        total_assets: outcome.total_assets,
        total_rules: outcome.rules.len(),
        total_checks: outcome.results.len(),
        passed: counts.passed,
        failed: counts.failed,
        warnings: counts.warnings,
        errors: counts.errors,
        skipped: counts.skipped,
        overall_score,
        compliance_level: ComplianceLevel::from_score(overall_score),
        risk_level: RiskLevel::from_score(overall_score),
        started_at: outcome.started_at,
        completed_at,
        duration_ms: (completed_at - outcome.started_at).num_milliseconds().max(0) as u64,
    };

    let category_breakdown = category_breakdown(&outcome.results, outcome.rules, config);
    let recommendations = recommendations::generate(&outcome.results, outcome.rules, config);
    let action_items = recommendations::action_items(&recommendations, outcome.rules, config);
    let certifications = certifications(overall_score, &outcome.results, outcome.rules, config);

    ComplianceReport {
        id: Uuid::new_v4(),
        brand_id: outcome.brand_id.to_string(),
        context: outcome.context.clone(),
        overview,
        rule_results: outcome.results,
        category_breakdown,
        recommendations,
        action_items,
        certifications,
    }
}

/// Whether the owning rule reports at the `silent` level.
pub(crate) fn is_silenced(rules: &[BrandRule], rule_id: &str) -> bool {
    rules
        .iter()
        .any(|r| r.id == rule_id && r.configuration.report_level == ReportLevel::Silent)
}

/// Breakdown for every category that produced at least one result, in
/// category order.
pub fn category_breakdown(
    results: &[ValidationResult],
    rules: &[BrandRule],
    config: &ComplianceConfig,
) -> Vec<CategoryBreakdown> {
    RuleCategory::ALL
        .iter()
        .filter_map(|&category| {
            let in_category: Vec<&ValidationResult> =
                results.iter().filter(|r| r.category == category).collect();
            if in_category.is_empty() {
                return None;
            }
            let counts = StatusCounts::tally(in_category.iter().copied());

            let top_issues = in_category
                .iter()
                .filter(|r| r.status == ValidationStatus::Fail && !is_silenced(rules, &r.rule_id))
                .take(config.max_top_issues)
                .map(|r| r.rule_name.clone())
                .collect();
            let quick_wins = in_category
                .iter()
                .filter(|r| {
                    r.status == ValidationStatus::Warning
                        && r.auto_fix_available
                        && !is_silenced(rules, &r.rule_id)
                })
                .take(config.max_quick_wins)
                .map(|r| r.rule_name.clone())
                .collect();

            Some(CategoryBreakdown {
                category,
                total: counts.scored(),
                passed: counts.passed,
                failed: counts.failed,
                warnings: counts.warnings,
                score: counts.score(),
                top_issues,
                quick_wins,
            })
        })
        .collect()
}

fn certifications(
    overall_score: u32,
    results: &[ValidationResult],
    rules: &[BrandRule],
    config: &ComplianceConfig,
) -> Vec<Certification> {
    let critical_error = results.iter().any(|r| {
        r.status == ValidationStatus::Error
            && rules
                .iter()
                .any(|rule| rule.id == r.rule_id && rule.business.impact == ImpactTier::Critical)
    });
    if overall_score < config.certification_threshold || critical_error {
        return Vec::new();
    }

    let issued_at = Utc::now();
    vec![Certification {
        name: "Brand Compliance".to_string(),
        level: ComplianceLevel::from_score(overall_score),
        issued_at,
        valid_until: issued_at + Duration::days(config.certification_validity_days),
    }]
}
