//! Per (asset, rule) evaluation: extract values, run the criteria, label the
//! outcome, and isolate failures into `error`-status results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use brand_core::{Asset, BrandError, BrandIdentity, BrandResult, ValidationContext};
use chrono::Utc;
use dashmap::DashMap;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::criteria::{self, CriterionOutcome};
use crate::extract;
use crate::scoring;
use crate::types::{
    BrandRule, Criteria, EnforcementLevel, Evidence, PerformanceMeta, ReportLevel,
    ResultContext, ValidationResult, ValidationStatus,
};
use crate::validators::{AiRequest, CustomRequest, ValidatorRegistry};

/// Compiled patterns kept before the cache is reset.
const MAX_CACHED_PATTERNS: usize = 512;

/// Criteria evaluation that completed without error.
struct Evaluation {
    actual: Value,
    expected: Value,
    outcome: CriterionOutcome,
    deviation: f64,
    validator: String,
    used_fallback: bool,
    evidence: Vec<Evidence>,
}

/// Stateless evaluator shared by full passes and the real-time path.
#[derive(Clone)]
pub struct Dispatcher {
    validators: Arc<ValidatorRegistry>,
    patterns: Arc<DashMap<String, Regex>>,
    ai_timeout: Duration,
}

impl Dispatcher {
    pub fn new(validators: ValidatorRegistry, ai_timeout: Duration) -> Self {
        Self {
            validators: Arc::new(validators),
            patterns: Arc::new(DashMap::new()),
            ai_timeout,
        }
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Evaluate `rule` against `asset`. Never fails: any extraction or
    /// criteria error becomes an `error`-status result.
    pub async fn evaluate(
        &self,
        asset: &Asset,
        rule: &BrandRule,
        brand: &BrandIdentity,
        context: &ValidationContext,
    ) -> ValidationResult {
        let start = Instant::now();

        if rule.configuration.enforcement_level == EnforcementLevel::Disabled {
            return skipped_result(asset, rule, start);
        }

        match self.try_evaluate(asset, rule, brand, context).await {
            Ok(eval) => build_result(asset, rule, eval, start),
            Err(e) => {
                warn!(
                    rule_id = %rule.id,
                    asset_id = %asset.id,
                    error = %e,
                    "rule evaluation failed"
                );
                error_result(asset, rule, &e, start)
            }
        }
    }

    async fn try_evaluate(
        &self,
        asset: &Asset,
        rule: &BrandRule,
        brand: &BrandIdentity,
        context: &ValidationContext,
    ) -> BrandResult<Evaluation> {
        let actual = extract::actual_value(asset, rule);
        let expected = extract::expected_value(brand, rule);
        let mut evidence = Vec::new();

        let (outcome, effective, used_fallback) = match &rule.criteria {
            Criteria::AiAnalysis {
                model,
                prompt,
                confidence_threshold,
                fallback_validation,
            } => {
                match self
                    .run_ai(model, prompt, &actual, &expected, context)
                    .await
                {
                    Ok((outcome, reasoning)) => {
                        evidence.push(Evidence {
                            kind: "ai_reasoning".to_string(),
                            description: reasoning,
                            value: json!({
                                "model": model,
                                "confidence_threshold": confidence_threshold,
                                "below_threshold": outcome.confidence < *confidence_threshold,
                            }),
                        });
                        (outcome, &rule.criteria, false)
                    }
                    Err(e) => match fallback_validation.as_deref() {
                        Some(fallback) => {
                            debug!(rule_id = %rule.id, error = %e, "ai validation unavailable, using fallback");
                            evidence.push(Evidence {
                                kind: "fallback".to_string(),
                                description: format!("ai-analysis unavailable: {e}"),
                                value: json!({ "fallback": fallback.kind() }),
                            });
                            let outcome = self
                                .evaluate_direct(fallback, &actual, &expected, context)
                                .await?;
                            (outcome, fallback, true)
                        }
                        None => return Err(e),
                    },
                }
            }
            direct => {
                let outcome = self
                    .evaluate_direct(direct, &actual, &expected, context)
                    .await?;
                (outcome, direct, false)
            }
        };

        let deviation = criteria::deviation(effective, &actual, &expected, &outcome);
        evidence.push(Evidence {
            kind: "criteria".to_string(),
            description: effective.kind().to_string(),
            value: outcome.details.clone(),
        });

        Ok(Evaluation {
            actual,
            expected,
            outcome,
            deviation,
            validator: effective.kind().to_string(),
            used_fallback,
            evidence,
        })
    }

    /// Evaluate a non-AI criteria.
    async fn evaluate_direct(
        &self,
        criteria: &Criteria,
        actual: &Value,
        expected: &Value,
        context: &ValidationContext,
    ) -> BrandResult<CriterionOutcome> {
        match criteria {
            Criteria::ExactMatch {
                allowed_values,
                case_sensitive,
            } => Ok(criteria::evaluate_exact_match(
                actual,
                expected,
                allowed_values,
                *case_sensitive,
            )),
            Criteria::Range { min, max, unit } => Ok(criteria::evaluate_range(
                actual,
                expected,
                *min,
                *max,
                unit.as_deref(),
            )),
            Criteria::Pattern { regex, flags } => {
                let pattern = self.pattern(regex, flags)?;
                Ok(criteria::evaluate_pattern(actual, &pattern))
            }
            Criteria::Custom {
                validator_function,
                parameters,
            } => {
                let validator = self.validators.custom(validator_function).ok_or_else(|| {
                    BrandError::ValidatorNotFound {
                        kind: "custom",
                        name: validator_function.clone(),
                    }
                })?;
                let request = CustomRequest {
                    actual: actual.clone(),
                    expected: expected.clone(),
                    parameters: parameters.clone(),
                    context: context.clone(),
                };
                // Own task so a panicking validator only fails this pair.
                let verdict = tokio::spawn(async move { validator.validate(request).await })
                    .await
                    .map_err(|e| backend_failure("custom", validator_function, e))??;
                Ok(CriterionOutcome::new(
                    verdict.score,
                    verdict.confidence,
                    verdict.details,
                ))
            }
            Criteria::AiAnalysis { .. } => Err(BrandError::UnsupportedCriteria(
                "ai-analysis cannot be used as a fallback".to_string(),
            )),
        }
    }

    /// Invoke the named AI backend under the configured timeout. A missing
    /// backend, a backend error, and a timeout all surface as `Err`.
    async fn run_ai(
        &self,
        model: &str,
        prompt: &str,
        actual: &Value,
        expected: &Value,
        context: &ValidationContext,
    ) -> BrandResult<(CriterionOutcome, String)> {
        let validator = self
            .validators
            .ai(model)
            .ok_or_else(|| BrandError::ValidatorNotFound {
                kind: "ai",
                name: model.to_string(),
            })?;

        let request = AiRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            actual: actual.clone(),
            expected: expected.clone(),
            context: context.clone(),
        };

        let mut call = tokio::spawn(async move { validator.validate(request).await });
        let verdict = match tokio::time::timeout(self.ai_timeout, &mut call).await {
            Ok(joined) => joined.map_err(|e| backend_failure("ai", model, e))??,
            Err(_) => {
                call.abort();
                return Err(BrandError::Timeout(self.ai_timeout.as_millis() as u64));
            }
        };

        let outcome = CriterionOutcome::new(
            verdict.score,
            verdict.confidence,
            json!({ "factors": verdict.factors }),
        );
        Ok((outcome, verdict.reasoning))
    }

    fn pattern(&self, regex: &str, flags: &str) -> BrandResult<Regex> {
        let key = format!("{flags}/{regex}");
        if let Some(compiled) = self.patterns.get(&key) {
            return Ok(compiled.clone());
        }
        let compiled = criteria::compile_pattern(regex, flags)
            .map_err(|e| BrandError::Evaluation(format!("invalid pattern '{regex}': {e}")))?;
        if self.patterns.len() >= MAX_CACHED_PATTERNS {
            self.patterns.clear();
        }
        self.patterns.insert(key, compiled.clone());
        Ok(compiled)
    }
}

fn backend_failure(kind: &str, name: &str, e: tokio::task::JoinError) -> BrandError {
    if e.is_panic() {
        BrandError::Evaluation(format!("{kind} validator '{name}' panicked"))
    } else {
        BrandError::Evaluation(format!("{kind} validator '{name}' was cancelled"))
    }
}

fn result_context(asset: &Asset, validator: &str) -> ResultContext {
    ResultContext {
        element_id: asset.id.clone(),
        location: asset
            .properties
            .get("location")
            .and_then(Value::as_str)
            .map(str::to_string),
        timestamp: Utc::now(),
        validator: validator.to_string(),
    }
}

fn build_result(
    asset: &Asset,
    rule: &BrandRule,
    eval: Evaluation,
    start: Instant,
) -> ValidationResult {
    let Evaluation {
        actual,
        expected,
        outcome,
        deviation,
        validator,
        used_fallback,
        evidence,
    } = eval;

    let status = scoring::resolve_for_rule(rule, outcome.score, outcome.confidence);
    let auto_fix_available = scoring::auto_fix_available(rule, outcome.score);
    let message = match status {
        ValidationStatus::Pass => format!("{} passed with score {}", rule.name, outcome.score),
        _ => format!(
            "{} scored {} (tolerance {}): expected {}, found {}",
            rule.name,
            outcome.score,
            rule.configuration.tolerance,
            display_value(&expected),
            display_value(&actual),
        ),
    };
    let (recommendations, evidence) = match rule.configuration.report_level {
        ReportLevel::Detailed => (
            result_recommendations(rule, status, &expected, auto_fix_available),
            evidence,
        ),
        ReportLevel::Summary | ReportLevel::Silent => (Vec::new(), Vec::new()),
    };

    ValidationResult {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        category: rule.category,
        status,
        score: outcome.score,
        confidence: outcome.confidence,
        actual_value: actual,
        expected_value: expected,
        deviation,
        context: result_context(asset, &validator),
        message,
        recommendations,
        auto_fix_available,
        performance: PerformanceMeta {
            evaluation_us: start.elapsed().as_micros() as u64,
            used_fallback,
        },
        evidence,
    }
}

/// Result recorded when evaluation of a pair raised.
pub fn error_result(
    asset: &Asset,
    rule: &BrandRule,
    error: &BrandError,
    start: Instant,
) -> ValidationResult {
    ValidationResult {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        category: rule.category,
        status: ValidationStatus::Error,
        score: 0.0,
        confidence: 0.0,
        actual_value: Value::Null,
        expected_value: Value::Null,
        deviation: 100.0,
        context: result_context(asset, rule.criteria.kind()),
        message: format!("Validation error: {error}"),
        recommendations: vec![format!(
            "Check the configuration of rule '{}' and its validators",
            rule.id
        )],
        auto_fix_available: false,
        performance: PerformanceMeta {
            evaluation_us: start.elapsed().as_micros() as u64,
            used_fallback: false,
        },
        evidence: Vec::new(),
    }
}

fn skipped_result(asset: &Asset, rule: &BrandRule, start: Instant) -> ValidationResult {
    ValidationResult {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        category: rule.category,
        status: ValidationStatus::Skipped,
        score: 0.0,
        confidence: 0.0,
        actual_value: Value::Null,
        expected_value: Value::Null,
        deviation: 0.0,
        context: result_context(asset, rule.criteria.kind()),
        message: format!("{} is disabled", rule.name),
        recommendations: Vec::new(),
        auto_fix_available: false,
        performance: PerformanceMeta {
            evaluation_us: start.elapsed().as_micros() as u64,
            used_fallback: false,
        },
        evidence: Vec::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "nothing".to_string(),
        other => criteria::stringify(other),
    }
}

fn result_recommendations(
    rule: &BrandRule,
    status: ValidationStatus,
    expected: &Value,
    auto_fix_available: bool,
) -> Vec<String> {
    if status == ValidationStatus::Pass {
        return Vec::new();
    }
    let mut recs = Vec::new();
    if !expected.is_null() {
        recs.push(format!(
            "Use the brand {} value {}",
            rule.category.as_str(),
            display_value(expected)
        ));
    }
    if auto_fix_available {
        recs.push("Run auto-fix to apply the brand value".to_string());
    }
    if !rule.definition.description.is_empty() {
        recs.push(rule.definition.description.clone());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_rules;
    use crate::validators::{AiValidator, AiVerdict};
    use async_trait::async_trait;
    use brand_core::types::{AssetType, BrandColors};

    struct FixedAi(f64, f64);

    #[async_trait]
    impl AiValidator for FixedAi {
        async fn validate(&self, _request: AiRequest) -> BrandResult<AiVerdict> {
            Ok(AiVerdict {
                score: self.0,
                confidence: self.1,
                reasoning: "fixed".to_string(),
                factors: vec!["tone".to_string()],
            })
        }
    }

    struct FailingAi;

    #[async_trait]
    impl AiValidator for FailingAi {
        async fn validate(&self, _request: AiRequest) -> BrandResult<AiVerdict> {
            Err(BrandError::AiValidation("model overloaded".to_string()))
        }
    }

    struct SlowAi;

    #[async_trait]
    impl AiValidator for SlowAi {
        async fn validate(&self, _request: AiRequest) -> BrandResult<AiVerdict> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(AiVerdict {
                score: 100.0,
                confidence: 1.0,
                reasoning: "too late".to_string(),
                factors: vec![],
            })
        }
    }

    fn rule(id: &str) -> BrandRule {
        default_rules().into_iter().find(|r| r.id == id).unwrap()
    }

    fn brand() -> BrandIdentity {
        BrandIdentity {
            id: "acme".into(),
            colors: BrandColors {
                primary: vec!["#0052CC".into()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::for_brand("acme")
    }

    fn dispatcher(validators: ValidatorRegistry) -> Dispatcher {
        Dispatcher::new(validators, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_exact_match_pass_and_fail() {
        let d = dispatcher(ValidatorRegistry::with_builtins());
        let rule = rule("primary-color");

        let ok = Asset::new("a", AssetType::Banner).with("color", "#0052cc");
        let result = d.evaluate(&ok, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Pass);
        assert_eq!(result.deviation, 0.0);
        assert!(!result.auto_fix_available);

        let bad = Asset::new("b", AssetType::Banner).with("color", "#FF00FF");
        let result = d.evaluate(&bad, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.deviation, 100.0);
        assert!(result.auto_fix_available);
        assert_eq!(result.asset_id(), "b");
    }

    #[tokio::test]
    async fn test_missing_custom_validator_is_isolated() {
        let d = dispatcher(ValidatorRegistry::new());
        let rule = rule("text-contrast");
        let asset = Asset::new("a", AssetType::Banner);
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.deviation, 100.0);
        assert!(result.message.contains("contrast_ratio"));
    }

    #[tokio::test]
    async fn test_ai_verdict_used_when_available() {
        let d = dispatcher(ValidatorRegistry::new().with_ai("brand-voice", Arc::new(FixedAi(85.0, 0.9))));
        let rule = rule("tone-of-voice");
        let asset = Asset::new("a", AssetType::SocialPost).with("tone-of-voice", "snarky");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Pass);
        assert_eq!(result.score, 85.0);
        assert!(!result.performance.used_fallback);
        assert!(result.evidence.iter().any(|e| e.kind == "ai_reasoning"));
    }

    #[tokio::test]
    async fn test_ai_failure_uses_fallback() {
        let d = dispatcher(ValidatorRegistry::new().with_ai("brand-voice", Arc::new(FailingAi)));
        let rule = rule("tone-of-voice");
        let asset = Asset::new("a", AssetType::SocialPost).with("tone-of-voice", "Warm");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Pass);
        assert!(result.performance.used_fallback);
        assert_eq!(result.context.validator, "exact-match");
    }

    #[tokio::test]
    async fn test_ai_missing_uses_fallback() {
        let d = dispatcher(ValidatorRegistry::new());
        let rule = rule("tone-of-voice");
        let asset = Asset::new("a", AssetType::SocialPost).with("tone-of-voice", "snarky");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert!(result.performance.used_fallback);
        assert_eq!(result.status, ValidationStatus::Fail);
    }

    #[tokio::test]
    async fn test_ai_timeout_treated_as_unavailable() {
        let d = dispatcher(ValidatorRegistry::new().with_ai("brand-voice", Arc::new(SlowAi)));
        let rule = rule("tone-of-voice");
        let asset = Asset::new("a", AssetType::SocialPost).with("tone-of-voice", "professional");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert!(result.performance.used_fallback);
        assert_eq!(result.status, ValidationStatus::Pass);
    }

    #[tokio::test]
    async fn test_ai_failure_without_fallback_is_error() {
        let d = dispatcher(ValidatorRegistry::new().with_ai("brand-voice", Arc::new(FailingAi)));
        let mut rule = rule("tone-of-voice");
        if let Criteria::AiAnalysis {
            fallback_validation,
            ..
        } = &mut rule.criteria
        {
            *fallback_validation = None;
        }
        let asset = Asset::new("a", AssetType::SocialPost).with("tone-of-voice", "warm");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Error);
        assert!(result.message.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_low_confidence_ai_is_warning() {
        let d = dispatcher(ValidatorRegistry::new().with_ai("brand-voice", Arc::new(FixedAi(100.0, 0.3))));
        let rule = rule("tone-of-voice");
        let asset = Asset::new("a", AssetType::SocialPost).with("tone-of-voice", "warm");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Warning);
    }

    #[tokio::test]
    async fn test_disabled_rule_skipped() {
        let d = dispatcher(ValidatorRegistry::new());
        let mut rule = rule("primary-color");
        rule.configuration.enforcement_level = EnforcementLevel::Disabled;
        let asset = Asset::new("a", AssetType::Banner).with("color", "#FF00FF");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Skipped);
    }

    #[tokio::test]
    async fn test_pattern_rule() {
        let d = dispatcher(ValidatorRegistry::new());
        let rule = rule("layout-grid");
        let asset = Asset::new("a", AssetType::Web).with("layout-grid", "12-Column");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Pass);

        let asset = Asset::new("b", AssetType::Web).with("layout-grid", "freeform");
        let result = d.evaluate(&asset, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Fail);
        assert_eq!(result.deviation, 50.0);
    }

    #[test]
    fn test_pattern_cache_is_bounded() {
        let d = dispatcher(ValidatorRegistry::new());
        for i in 0..MAX_CACHED_PATTERNS + 10 {
            d.pattern(&format!("^item-{i}$"), "").unwrap();
        }
        assert!(d.patterns.len() <= MAX_CACHED_PATTERNS);
        assert!(d.pattern("^item-1$", "").unwrap().is_match("item-1"));
    }

    #[tokio::test]
    async fn test_summary_level_drops_detail() {
        let d = dispatcher(ValidatorRegistry::new());
        let mut rule = rule("primary-color");
        rule.configuration.report_level = crate::types::ReportLevel::Summary;
        let bad = Asset::new("b", AssetType::Banner).with("color", "#FF00FF");
        let result = d.evaluate(&bad, &rule, &brand(), &ctx()).await;
        assert_eq!(result.status, ValidationStatus::Error);
        assert!(result.evidence.is_empty());
        assert!(result.recommendations.is_empty());
    }
}
