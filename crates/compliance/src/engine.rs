//! Compliance engine: full validation passes, the real-time path, and the
//! auto-fix batch over a shared rule registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use brand_core::config::ComplianceConfig;
use brand_core::event_bus::LogSink;
use brand_core::{
    Asset, BrandError, BrandIdentity, BrandResult, Notification, NotificationKind,
    NotificationSink, ValidationContext,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::autofix::{self, AssetCorrector, AutoFixSummary, ExpectedValueCorrector};
use crate::dispatcher::{self, Dispatcher};
use crate::history::{HistoryRecord, ValidationHistory};
use crate::registry::{filter_applicable, RuleRegistry};
use crate::report::{self, PassOutcome};
use crate::types::{
    BrandRule, ComplianceReport, ImpactTier, RealtimeReport, ValidationOptions, ValidationResult,
    ValidationStatus,
};
use crate::validators::ValidatorRegistry;

/// Owns the registry, evaluator, and history for one brand-guardian node.
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ComplianceEngine {
    registry: Arc<RuleRegistry>,
    dispatcher: Dispatcher,
    history: Arc<ValidationHistory>,
    sink: Arc<dyn NotificationSink>,
    corrector: Arc<dyn AssetCorrector>,
    config: Arc<ComplianceConfig>,
}

impl ComplianceEngine {
    pub fn new(
        registry: RuleRegistry,
        validators: ValidatorRegistry,
        config: ComplianceConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(validators, Duration::from_millis(config.ai_timeout_ms));
        Self {
            registry: Arc::new(registry),
            dispatcher,
            history: Arc::new(ValidationHistory::with_max_records(config.history_max_records)),
            sink: Arc::new(LogSink),
            corrector: Arc::new(ExpectedValueCorrector),
            config: Arc::new(config),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_corrector(mut self, corrector: Arc<dyn AssetCorrector>) -> Self {
        self.corrector = corrector;
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn history(&self) -> &ValidationHistory {
        &self.history
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        self.dispatcher.validators()
    }

    /// Run every applicable rule against every asset and aggregate the
    /// results. Per-pair failures become `error` results; only setup
    /// problems are returned as `Err`.
    pub async fn validate(
        &self,
        assets: &[Asset],
        brand: &BrandIdentity,
        context: &ValidationContext,
        options: &ValidationOptions,
    ) -> BrandResult<ComplianceReport> {
        self.preflight(brand)?;
        let started_at = Utc::now();
        let start = Instant::now();

        let rules = Arc::new(filter_applicable(
            &self.registry.snapshot(),
            context,
            options,
        ));
        info!(
            brand_id = %brand.id,
            assets = assets.len(),
            rules = rules.len(),
            "starting validation pass"
        );

        let results = if self.config.parallel_assets {
            self.evaluate_parallel(assets, &rules, brand, context).await
        } else {
            let mut results = Vec::with_capacity(assets.len() * rules.len());
            for asset in assets {
                results.extend(evaluate_asset(&self.dispatcher, asset, &rules, brand, context).await);
            }
            results
        };

        for r in &results {
            metrics::counter!("compliance.results", "status" => status_label(r.status)).increment(1);
        }

        let report = report::build_report(
            PassOutcome {
                brand_id: &brand.id,
                context,
                total_assets: assets.len(),
                rules: &rules,
                results,
                started_at,
            },
            &self.config,
        );

        self.history.append(HistoryRecord::from_report(&report));
        self.sink.notify(Notification::new(
            NotificationKind::ComplianceReport,
            brand.id.clone(),
            format!("Compliance report: {}", report.overview.overall_score),
            json!({ "report_id": report.id, "overview": report.overview }),
        ));

        metrics::counter!("compliance.passes").increment(1);
        metrics::histogram!("compliance.pass_latency_ms").record(start.elapsed().as_millis() as f64);
        info!(
            brand_id = %brand.id,
            report_id = %report.id,
            score = report.overview.overall_score,
            checks = report.overview.total_checks,
            "validation pass complete"
        );
        Ok(report)
    }

    /// One task per asset; handles are awaited in asset order so the result
    /// list keeps the assets-outer, rules-inner sequence.
    async fn evaluate_parallel(
        &self,
        assets: &[Asset],
        rules: &Arc<Vec<BrandRule>>,
        brand: &BrandIdentity,
        context: &ValidationContext,
    ) -> Vec<ValidationResult> {
        let brand = Arc::new(brand.clone());
        let context = Arc::new(context.clone());

        let handles: Vec<_> = assets
            .iter()
            .map(|asset| {
                let dispatcher = self.dispatcher.clone();
                let asset = asset.clone();
                let rules = rules.clone();
                let brand = brand.clone();
                let context = context.clone();
                tokio::spawn(async move {
                    evaluate_asset(&dispatcher, &asset, &rules, &brand, &context).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(assets.len() * rules.len());
        for (handle, asset) in handles.into_iter().zip(assets) {
            match handle.await {
                Ok(asset_results) => results.extend(asset_results),
                Err(e) => {
                    error!(asset_id = %asset.id, error = %e, "asset evaluation task failed");
                    let err = BrandError::Internal(anyhow::anyhow!("evaluation task failed: {e}"));
                    results.extend(
                        rules
                            .iter()
                            .map(|rule| dispatcher::error_result(asset, rule, &err, Instant::now())),
                    );
                }
            }
        }
        results
    }

    /// Evaluate one asset against high-priority rules, stopping at the first
    /// `error` result from a critical-impact rule.
    ///
    /// With `rule_ids` the caller's order is kept and unknown ids are
    /// ignored. Otherwise the top rules that are critical or at or above the
    /// configured priority threshold are used.
    pub async fn validate_realtime(
        &self,
        asset: &Asset,
        brand: &BrandIdentity,
        context: &ValidationContext,
        rule_ids: Option<&[String]>,
    ) -> BrandResult<RealtimeReport> {
        self.preflight(brand)?;
        let start = Instant::now();
        let snapshot = self.registry.snapshot();

        let rules: Vec<BrandRule> = match rule_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| snapshot.iter().find(|r| &r.id == id).cloned())
                .collect(),
            None => filter_applicable(&snapshot, context, &ValidationOptions::default())
                .into_iter()
                .filter(|r| {
                    r.business.impact == ImpactTier::Critical
                        || r.priority >= self.config.realtime_priority_threshold
                })
                .take(self.config.realtime_rule_limit)
                .collect(),
        };

        let mut results = Vec::with_capacity(rules.len());
        let mut halted_early = false;
        for (idx, rule) in rules.iter().enumerate() {
            let result = self.dispatcher.evaluate(asset, rule, brand, context).await;
            let critical = is_critical_error(&result, rule);
            results.push(result);
            if critical {
                halted_early = idx + 1 < rules.len();
                break;
            }
        }

        let critical: Vec<&ValidationResult> = results
            .iter()
            .zip(&rules)
            .filter(|(r, rule)| is_critical_error(r, rule))
            .map(|(r, _)| r)
            .collect();
        let critical_failures = critical.len();
        let alert_sent = critical_failures > 0;

        if alert_sent {
            metrics::counter!("compliance.realtime.halts").increment(1);
            warn!(
                asset_id = %asset.id,
                brand_id = %brand.id,
                critical_failures,
                "critical brand violation in real-time validation"
            );
            self.sink.notify(Notification::new(
                NotificationKind::CriticalAlert,
                brand.id.clone(),
                format!("Critical brand violation on {}", asset.id),
                json!({
                    "asset_id": asset.id,
                    "violations": critical
                        .iter()
                        .map(|r| json!({ "rule_id": r.rule_id, "message": r.message }))
                        .collect::<Vec<_>>(),
                }),
            ));
        }

        Ok(RealtimeReport {
            asset_id: asset.id.clone(),
            rules_selected: rules.len(),
            results,
            halted_early,
            critical_failures,
            alert_sent,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Apply corrections for eligible failures from a prior pass.
    pub async fn auto_fix(
        &self,
        results: &[ValidationResult],
        brand: &BrandIdentity,
        cap: Option<usize>,
    ) -> AutoFixSummary {
        let cap = cap.unwrap_or(self.config.auto_fix_cap);
        let rules = self.registry.snapshot();
        let summary = autofix::run_batch(results, &rules, brand, self.corrector.as_ref(), cap).await;

        metrics::counter!("compliance.autofix.attempted").increment(summary.attempted as u64);
        if summary.attempted > 0 {
            self.sink.notify(Notification::new(
                NotificationKind::AutoFixSummary,
                brand.id.clone(),
                format!("Auto-fix applied {} corrections", summary.successful),
                json!({
                    "eligible": summary.eligible,
                    "attempted": summary.attempted,
                    "successful": summary.successful,
                    "failed": summary.failed,
                }),
            ));
        }
        summary
    }

    fn preflight(&self, brand: &BrandIdentity) -> BrandResult<()> {
        if brand.id.trim().is_empty() {
            return Err(BrandError::Config("brand identity id is required".to_string()));
        }
        Ok(())
    }
}

async fn evaluate_asset(
    dispatcher: &Dispatcher,
    asset: &Asset,
    rules: &[BrandRule],
    brand: &BrandIdentity,
    context: &ValidationContext,
) -> Vec<ValidationResult> {
    let mut results = Vec::with_capacity(rules.len());
    for rule in rules {
        results.push(dispatcher.evaluate(asset, rule, brand, context).await);
    }
    results
}

fn is_critical_error(result: &ValidationResult, rule: &BrandRule) -> bool {
    result.status == ValidationStatus::Error && rule.business.impact == ImpactTier::Critical
}

fn status_label(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Pass => "pass",
        ValidationStatus::Fail => "fail",
        ValidationStatus::Warning => "warning",
        ValidationStatus::Error => "error",
        ValidationStatus::Skipped => "skipped",
    }
}
