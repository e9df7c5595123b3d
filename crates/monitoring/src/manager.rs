//! Monitoring manager: sets up sessions, schedules periodic checks, and routes
//! each check through an available guardian.

use std::sync::Arc;

use async_trait::async_trait;
use brand_compliance::{
    AutoFixSummary, ComplianceEngine, ComplianceReport, ValidationOptions,
};
use brand_core::config::MonitoringDefaults;
use brand_core::{
    Asset, BrandError, BrandIdentity, BrandResult, Notification, NotificationKind,
    NotificationSink, ValidationContext,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::guardian::{
    AuthorityLevel, CheckRecord, EscalationRule, Guardian, GuardianConfig, GuardianPerformance,
    GuardianStatus, GuardianTable,
};
use crate::schedule::Frequency;

/// Supplies the assets a monitoring check validates.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn assets(&self, brand_id: &str) -> BrandResult<Vec<Asset>>;
}

/// In-memory asset source keyed by brand id.
#[derive(Default)]
pub struct StaticAssetSource {
    assets: DashMap<String, Vec<Asset>>,
}

impl StaticAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_assets(&self, brand_id: impl Into<String>, assets: Vec<Asset>) {
        self.assets.insert(brand_id.into(), assets);
    }
}

#[async_trait]
impl AssetSource for StaticAssetSource {
    async fn assets(&self, brand_id: &str) -> BrandResult<Vec<Asset>> {
        Ok(self
            .assets
            .get(brand_id)
            .map(|a| a.value().clone())
            .unwrap_or_default())
    }
}

/// Request body for a new monitoring session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// `daily`, `weekly`, or `monthly`.
    pub frequency: Option<String>,
    #[serde(default)]
    pub guardians: Vec<GuardianConfig>,
    #[serde(default)]
    pub auto_fix: bool,
    #[serde(default)]
    pub options: ValidationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSession {
    pub id: Uuid,
    pub brand: BrandIdentity,
    pub context: ValidationContext,
    pub frequency: Frequency,
    pub auto_fix: bool,
    pub options: ValidationOptions,
    pub guardian_ids: Vec<Uuid>,
    pub next_check: DateTime<Utc>,
    pub last_check: Option<DateTime<Utc>>,
    pub last_score: Option<u32>,
    pub checks_run: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub session_id: Uuid,
    pub guardian_id: Option<Uuid>,
    /// Set when no validation ran.
    pub skipped_reason: Option<String>,
    pub report: Option<ComplianceReport>,
    pub alerted: bool,
    pub escalated: bool,
    pub auto_fix: Option<AutoFixSummary>,
}

pub struct MonitoringManager {
    engine: ComplianceEngine,
    sessions: DashMap<Uuid, MonitoringSession>,
    guardians: GuardianTable,
    jobs: DashMap<Uuid, JoinHandle<()>>,
    assets: Arc<dyn AssetSource>,
    sink: Arc<dyn NotificationSink>,
    defaults: MonitoringDefaults,
}

impl MonitoringManager {
    pub fn new(
        engine: ComplianceEngine,
        assets: Arc<dyn AssetSource>,
        sink: Arc<dyn NotificationSink>,
        defaults: MonitoringDefaults,
    ) -> Self {
        info!("Monitoring manager initialized");
        Self {
            engine,
            sessions: DashMap::new(),
            guardians: GuardianTable::new(),
            jobs: DashMap::new(),
            assets,
            sink,
            defaults,
        }
    }

    /// Create a session and its guardians, then schedule periodic checks on
    /// the current tokio runtime if one is running.
    pub fn setup_monitoring(
        self: &Arc<Self>,
        brand: BrandIdentity,
        context: ValidationContext,
        config: MonitoringConfig,
    ) -> BrandResult<MonitoringSession> {
        if brand.id.trim().is_empty() {
            return Err(BrandError::Config("brand identity id is required".to_string()));
        }
        // Checks are routed through guardians; a session without any could
        // never validate.
        if config.guardians.is_empty() {
            return Err(BrandError::Config(
                "monitoring requires at least one guardian".to_string(),
            ));
        }
        for g in &config.guardians {
            if let Some(t) = g.alert_threshold {
                if !(0.0..=100.0).contains(&t) {
                    return Err(BrandError::Config(format!(
                        "guardian '{}' alert_threshold {t} is outside 0-100",
                        g.name
                    )));
                }
            }
        }

        let now = Utc::now();
        let frequency = Frequency::parse(
            config
                .frequency
                .as_deref()
                .unwrap_or(&self.defaults.default_frequency),
        );
        let session_id = Uuid::new_v4();

        let guardian_ids = config
            .guardians
            .into_iter()
            .map(|g| {
                let guardian = self.build_guardian(session_id, g, now);
                let id = guardian.id;
                self.guardians.insert(guardian);
                id
            })
            .collect();

        let session = MonitoringSession {
            id: session_id,
            brand,
            context,
            frequency,
            auto_fix: config.auto_fix,
            options: config.options,
            guardian_ids,
            next_check: frequency.next_check(now),
            last_check: None,
            last_score: None,
            checks_run: 0,
            created_at: now,
        };
        self.sessions.insert(session_id, session.clone());
        self.schedule(session_id, frequency);

        info!(
            session_id = %session_id,
            brand_id = %session.brand.id,
            frequency = ?frequency,
            guardians = session.guardian_ids.len(),
            "monitoring session started"
        );
        Ok(session)
    }

    fn build_guardian(&self, session_id: Uuid, config: GuardianConfig, now: DateTime<Utc>) -> Guardian {
        Guardian {
            id: Uuid::new_v4(),
            session_id,
            name: config.name,
            guardian_type: config.guardian_type,
            responsibilities: config.responsibilities,
            authority: config.authority,
            scope: config.scope,
            alert_threshold: config
                .alert_threshold
                .unwrap_or(self.defaults.default_alert_threshold),
            escalation: config.escalation.unwrap_or_else(|| EscalationRule {
                after_failures: self.defaults.escalation_after_failures,
                notify: Vec::new(),
            }),
            working_hours: config.working_hours,
            performance: GuardianPerformance::default(),
            status: GuardianStatus::Active,
            load: 0,
            created_at: now,
        }
    }

    fn schedule(self: &Arc<Self>, session_id: Uuid, frequency: Frequency) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(session_id = %session_id, "no async runtime, periodic checks not scheduled");
            return;
        };
        let manager = Arc::downgrade(self);
        let job = handle.spawn(async move {
            let mut interval = tokio::time::interval(frequency.std_interval());
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if let Err(e) = manager.run_check(session_id).await {
                    error!(session_id = %session_id, error = %e, "scheduled monitoring check failed");
                }
            }
        });
        self.jobs.insert(session_id, job);
    }

    /// Run one check for a session through the least-loaded available
    /// guardian. Without an available guardian the check is skipped.
    pub async fn run_check(&self, session_id: Uuid) -> BrandResult<CheckOutcome> {
        let session = self
            .get_session(&session_id)
            .ok_or_else(|| BrandError::SessionNotFound(session_id.to_string()))?;
        let now = Utc::now();
        metrics::counter!("monitoring.checks").increment(1);

        let Some(guardian) = self.guardians.acquire(&session_id, now) else {
            warn!(session_id = %session_id, "no active guardian available, check skipped");
            self.finish_check(&session_id, now, None);
            return Ok(CheckOutcome {
                session_id,
                guardian_id: None,
                skipped_reason: Some("no active guardian available".to_string()),
                report: None,
                alerted: false,
                escalated: false,
                auto_fix: None,
            });
        };

        let result = self.validate_for(&session, &guardian).await;
        self.guardians.release(&guardian.id);
        let report = result?;

        let score = report.overview.overall_score;
        let record = self
            .guardians
            .record_check(&guardian.id, score, now)
            .unwrap_or(CheckRecord {
                alerted: false,
                escalated: false,
            });

        let CheckRecord { alerted, escalated } = record;

        if alerted {
            metrics::counter!("monitoring.alerts").increment(1);
            warn!(
                session_id = %session_id,
                guardian = %guardian.name,
                score,
                threshold = guardian.alert_threshold,
                "compliance below guardian threshold"
            );
            self.sink.notify(Notification::new(
                NotificationKind::GuardianAlert,
                session.brand.id.clone(),
                format!("{} scored {} (threshold {})", session.brand.id, score, guardian.alert_threshold),
                json!({
                    "session_id": session_id,
                    "guardian_id": guardian.id,
                    "report_id": report.id,
                    "score": score,
                }),
            ));
        }
        if escalated {
            self.sink.notify(Notification::new(
                NotificationKind::Escalation,
                session.brand.id.clone(),
                format!("Repeated compliance alerts for {}", session.brand.id),
                json!({
                    "session_id": session_id,
                    "guardian_id": guardian.id,
                    "after_failures": guardian.escalation.after_failures,
                    "notify": guardian.escalation.notify,
                }),
            ));
        }

        let auto_fix = if guardian.authority == AuthorityLevel::Enforce && session.auto_fix {
            Some(
                self.engine
                    .auto_fix(&report.rule_results, &session.brand, None)
                    .await,
            )
        } else {
            None
        };

        self.finish_check(&session_id, now, Some(score));
        Ok(CheckOutcome {
            session_id,
            guardian_id: Some(guardian.id),
            skipped_reason: None,
            report: Some(report),
            alerted,
            escalated,
            auto_fix,
        })
    }

    async fn validate_for(
        &self,
        session: &MonitoringSession,
        guardian: &Guardian,
    ) -> BrandResult<ComplianceReport> {
        let assets = self.assets.assets(&session.brand.id).await?;
        let mut options = session.options.clone();
        if !guardian.scope.categories.is_empty() {
            options.categories = guardian.scope.categories.clone();
        }
        self.engine
            .validate(&assets, &session.brand, &session.context, &options)
            .await
    }

    fn finish_check(&self, session_id: &Uuid, at: DateTime<Utc>, score: Option<u32>) {
        if let Some(mut s) = self.sessions.get_mut(session_id) {
            s.last_check = Some(at);
            s.next_check = s.frequency.next_check(at);
            s.checks_run += 1;
            if score.is_some() {
                s.last_score = score;
            }
        }
    }

    pub fn get_session(&self, id: &Uuid) -> Option<MonitoringSession> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn list_sessions(&self) -> Vec<MonitoringSession> {
        let mut list: Vec<_> = self.sessions.iter().map(|s| s.value().clone()).collect();
        list.sort_by_key(|s| s.created_at);
        list
    }

    pub fn guardians(&self, session_id: &Uuid) -> Vec<Guardian> {
        self.guardians.for_session(session_id)
    }

    pub fn set_guardian_status(&self, guardian_id: &Uuid, status: GuardianStatus) -> BrandResult<Guardian> {
        self.guardians.set_status(guardian_id, status)
    }

    /// Stop the schedule and drop the session with its guardians.
    pub fn teardown(&self, session_id: &Uuid) -> BrandResult<MonitoringSession> {
        let (_, session) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| BrandError::SessionNotFound(session_id.to_string()))?;
        if let Some((_, job)) = self.jobs.remove(session_id) {
            job.abort();
        }
        let removed = self.guardians.remove_session(session_id);
        info!(session_id = %session_id, guardians = removed, "monitoring session stopped");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardian::GuardianScope;
    use brand_compliance::{RuleCategory, RuleRegistry, ValidatorRegistry};
    use brand_core::config::ComplianceConfig;
    use brand_core::event_bus::{capture_sink, CaptureSink};
    use brand_core::types::{AssetType, BrandColors, BrandSpacing};

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

    fn manager(assets: Vec<Asset>) -> (Arc<MonitoringManager>, Arc<CaptureSink>) {
        let sink = capture_sink();
        let engine = ComplianceEngine::new(
            RuleRegistry::with_default_rules(),
            ValidatorRegistry::with_builtins(),
            ComplianceConfig::default(),
        )
        .with_sink(sink.clone());
        let source = StaticAssetSource::new();
        source.set_assets("acme", assets);
        let manager = MonitoringManager::new(
            engine,
            Arc::new(source),
            sink.clone(),
            MonitoringDefaults::default(),
        );
        (Arc::new(manager), sink)
    }

    fn color_guardian(authority: AuthorityLevel) -> GuardianConfig {
        GuardianConfig {
            name: "color-watch".into(),
            authority,
            scope: GuardianScope {
                categories: vec![RuleCategory::Color],
            },
            alert_threshold: Some(90.0),
            escalation: Some(EscalationRule {
                after_failures: 2,
                notify: vec!["brand-lead".into()],
            }),
            ..Default::default()
        }
    }

    fn off_brand() -> Vec<Asset> {
        vec![Asset::new("a", AssetType::Banner).with("color", "#FF00FF")]
    }

    #[test]
    fn test_setup_without_runtime() {
        let (manager, _) = manager(vec![]);
        let session = manager
            .setup_monitoring(
                brand(),
                ValidationContext::for_brand("acme"),
                MonitoringConfig {
                    frequency: Some("fortnightly".into()),
                    guardians: vec![color_guardian(AuthorityLevel::Advise)],
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(session.frequency, Frequency::Weekly);
        assert_eq!((session.next_check - session.created_at).num_days(), 7);
        let guardians = manager.guardians(&session.id);
        assert_eq!(guardians.len(), 1);
        assert_eq!(guardians[0].status, GuardianStatus::Active);
        assert_eq!(guardians[0].load, 0);
        assert_eq!(guardians[0].performance.checks_run, 0);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let (manager, _) = manager(vec![]);
        let mut g = color_guardian(AuthorityLevel::Advise);
        g.alert_threshold = Some(140.0);
        let err = manager
            .setup_monitoring(
                brand(),
                ValidationContext::for_brand("acme"),
                MonitoringConfig {
                    guardians: vec![g],
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, BrandError::Config(_)));
    }

    #[tokio::test]
    async fn test_check_alerts_then_escalates() {
        let (manager, sink) = manager(off_brand());
        let session = manager
            .setup_monitoring(
                brand(),
                ValidationContext::for_brand("acme"),
                MonitoringConfig {
                    frequency: Some("daily".into()),
                    guardians: vec![color_guardian(AuthorityLevel::Advise)],
                    ..Default::default()
                },
            )
            .unwrap();

        let first = manager.run_check(session.id).await.unwrap();
        assert!(first.alerted);
        assert!(!first.escalated);
        // Guardian scope narrows the pass to color rules.
        let report = first.report.unwrap();
        assert!(report
            .rule_results
            .iter()
            .all(|r| r.category == RuleCategory::Color));

        let second = manager.run_check(session.id).await.unwrap();
        assert!(second.escalated);
        assert_eq!(sink.count_kind(NotificationKind::GuardianAlert), 2);
        assert_eq!(sink.count_kind(NotificationKind::Escalation), 1);

        let stored = manager.get_session(&session.id).unwrap();
        assert_eq!(stored.checks_run, 2);
        assert_eq!(stored.last_score, Some(0));
        assert_eq!(manager.guardians(&session.id)[0].load, 0);
    }

    #[tokio::test]
    async fn test_inactive_guardian_never_dispatches() {
        let (manager, _) = manager(off_brand());
        let session = manager
            .setup_monitoring(
                brand(),
                ValidationContext::for_brand("acme"),
                MonitoringConfig {
                    guardians: vec![color_guardian(AuthorityLevel::Advise)],
                    ..Default::default()
                },
            )
            .unwrap();
        let gid = session.guardian_ids[0];
        manager
            .set_guardian_status(&gid, GuardianStatus::Inactive)
            .unwrap();

        let outcome = manager.run_check(session.id).await.unwrap();
        assert!(outcome.report.is_none());
        assert!(outcome.skipped_reason.is_some());
        assert_eq!(manager.engine.history().len(), 0);
        teardown_ok(&manager, session.id);
    }

    #[tokio::test]
    async fn test_enforce_guardian_runs_auto_fix() {
        let (manager, _) = manager(off_brand());
        let session = manager
            .setup_monitoring(
                brand(),
                ValidationContext::for_brand("acme"),
                MonitoringConfig {
                    guardians: vec![color_guardian(AuthorityLevel::Enforce)],
                    auto_fix: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let outcome = manager.run_check(session.id).await.unwrap();
        // The color failure is an error (not a fail), so nothing is eligible.
        let summary = outcome.auto_fix.unwrap();
        assert_eq!(summary.attempted, 0);
    }

    #[tokio::test]
    async fn test_enforce_guardian_corrects_spacing() {
        let (manager, sink) = manager(vec![
            Asset::new("a", AssetType::Banner).with("spacing", 40)
        ]);
        let mut brand = brand();
        brand.spacing = BrandSpacing { base_unit: Some(8.0) };
        let session = manager
            .setup_monitoring(
                brand,
                ValidationContext::for_brand("acme"),
                MonitoringConfig {
                    guardians: vec![GuardianConfig {
                        name: "spacing-enforcer".into(),
                        authority: AuthorityLevel::Enforce,
                        scope: GuardianScope {
                            categories: vec![RuleCategory::Spacing],
                        },
                        ..Default::default()
                    }],
                    auto_fix: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let outcome = manager.run_check(session.id).await.unwrap();
        let summary = outcome.auto_fix.unwrap();
        assert_eq!(summary.eligible, 1);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.corrections[0].rule_id, "spacing-scale");
        assert_eq!(summary.corrections[0].to, json!(8.0));
        assert_eq!(sink.count_kind(NotificationKind::AutoFixSummary), 1);
    }

    #[test]
    fn test_session_without_guardians_rejected() {
        let (manager, _) = manager(vec![]);
        let err = manager
            .setup_monitoring(
                brand(),
                ValidationContext::for_brand("acme"),
                MonitoringConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, BrandError::Config(_)));
        assert!(manager.list_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (manager, _) = manager(vec![]);
        let err = manager.run_check(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BrandError::SessionNotFound(_)));
        assert!(manager.teardown(&Uuid::new_v4()).is_err());
    }

    fn teardown_ok(manager: &MonitoringManager, id: Uuid) {
        manager.teardown(&id).unwrap();
        assert!(manager.get_session(&id).is_none());
        assert!(manager.guardians(&id).is_empty());
    }
}
