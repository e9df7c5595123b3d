//! Guardians: monitoring entities that own a scope of rules within a session.

use brand_compliance::RuleCategory;
use brand_core::{BrandError, BrandResult};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuardianType {
    #[default]
    Automated,
    Human,
    Hybrid,
}

/// What a guardian may do with a failing check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    /// Records results only.
    Observe,
    /// Raises alerts and escalations.
    #[default]
    Advise,
    /// Also runs the auto-fix pass when the session allows it.
    Enforce,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuardianStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardianScope {
    /// Empty means every category.
    #[serde(default)]
    pub categories: Vec<RuleCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRule {
    /// Consecutive alerting checks before an escalation fires.
    pub after_failures: u32,
    #[serde(default)]
    pub notify: Vec<String>,
}

/// UTC hours during which a guardian takes checks. `start_hour == end_hour`
/// means around the clock; `start_hour > end_hour` wraps past midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Empty means every day.
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl WorkingHours {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if !self.days.is_empty() && !self.days.contains(&at.weekday()) {
            return false;
        }
        let hour = at.hour();
        match self.start_hour.cmp(&self.end_hour) {
            std::cmp::Ordering::Equal => true,
            std::cmp::Ordering::Less => hour >= self.start_hour && hour < self.end_hour,
            std::cmp::Ordering::Greater => hour >= self.start_hour || hour < self.end_hour,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardianPerformance {
    pub checks_run: u64,
    pub alerts_raised: u64,
    pub escalations: u64,
    pub consecutive_alerts: u32,
    pub average_score: f64,
    pub last_check_at: Option<DateTime<Utc>>,
}

/// Guardian definition supplied when a monitoring session is set up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardianConfig {
    pub name: String,
    #[serde(default)]
    pub guardian_type: GuardianType,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub authority: AuthorityLevel,
    #[serde(default)]
    pub scope: GuardianScope,
    pub alert_threshold: Option<f64>,
    pub escalation: Option<EscalationRule>,
    pub working_hours: Option<WorkingHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guardian {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub guardian_type: GuardianType,
    pub responsibilities: Vec<String>,
    pub authority: AuthorityLevel,
    pub scope: GuardianScope,
    pub alert_threshold: f64,
    pub escalation: EscalationRule,
    pub working_hours: Option<WorkingHours>,
    pub performance: GuardianPerformance,
    pub status: GuardianStatus,
    /// Checks currently in flight.
    pub load: u32,
    pub created_at: DateTime<Utc>,
}

impl Guardian {
    pub fn available_at(&self, at: DateTime<Utc>) -> bool {
        self.status == GuardianStatus::Active
            && self.working_hours.as_ref().map_or(true, |h| h.contains(at))
    }
}

/// Outcome of recording a finished check against a guardian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckRecord {
    pub alerted: bool,
    pub escalated: bool,
}

/// Concurrent guardian table keyed by guardian id.
#[derive(Default)]
pub struct GuardianTable {
    guardians: DashMap<Uuid, Guardian>,
}

impl GuardianTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, guardian: Guardian) {
        self.guardians.insert(guardian.id, guardian);
    }

    pub fn get(&self, id: &Uuid) -> Option<Guardian> {
        self.guardians.get(id).map(|g| g.clone())
    }

    pub fn len(&self) -> usize {
        self.guardians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guardians.is_empty()
    }

    /// Guardians of a session in creation order.
    pub fn for_session(&self, session_id: &Uuid) -> Vec<Guardian> {
        let mut list: Vec<Guardian> = self
            .guardians
            .iter()
            .filter(|g| g.session_id == *session_id)
            .map(|g| g.value().clone())
            .collect();
        list.sort_by_key(|g| (g.created_at, g.id));
        list
    }

    pub fn set_status(&self, id: &Uuid, status: GuardianStatus) -> BrandResult<Guardian> {
        let mut entry = self
            .guardians
            .get_mut(id)
            .ok_or_else(|| BrandError::GuardianNotFound(id.to_string()))?;
        let previous = entry.status;
        entry.status = status;
        info!(guardian_id = %id, from = ?previous, to = ?status, "guardian status changed");
        Ok(entry.clone())
    }

    /// Claim the least-loaded guardian of `session_id` available at `at`,
    /// incrementing its load. Ties go to the earliest created.
    pub fn acquire(&self, session_id: &Uuid, at: DateTime<Utc>) -> Option<Guardian> {
        let chosen = self
            .for_session(session_id)
            .into_iter()
            .filter(|g| g.available_at(at))
            .min_by_key(|g| g.load)?;
        let mut entry = self.guardians.get_mut(&chosen.id)?;
        // Re-check under the entry lock; the status may have changed.
        if entry.status != GuardianStatus::Active {
            return None;
        }
        entry.load += 1;
        Some(entry.clone())
    }

    pub fn release(&self, id: &Uuid) {
        if let Some(mut entry) = self.guardians.get_mut(id) {
            entry.load = entry.load.saturating_sub(1);
        }
    }

    /// Fold a finished check into the guardian's counters and decide whether
    /// it alerts and escalates. `Observe` guardians never alert, so their
    /// alert and escalation counters stay at zero.
    pub fn record_check(&self, id: &Uuid, score: u32, at: DateTime<Utc>) -> Option<CheckRecord> {
        let mut g = self.guardians.get_mut(id)?;
        let perf = &mut g.performance;
        let n = perf.checks_run as f64;
        perf.average_score = (perf.average_score * n + score as f64) / (n + 1.0);
        perf.checks_run += 1;
        perf.last_check_at = Some(at);

        let alerted =
            g.authority != AuthorityLevel::Observe && (score as f64) < g.alert_threshold;
        let mut escalated = false;
        if alerted {
            g.performance.alerts_raised += 1;
            g.performance.consecutive_alerts += 1;
            if g.performance.consecutive_alerts >= g.escalation.after_failures.max(1) {
                g.performance.escalations += 1;
                g.performance.consecutive_alerts = 0;
                escalated = true;
            }
        } else {
            g.performance.consecutive_alerts = 0;
        }
        Some(CheckRecord { alerted, escalated })
    }

    /// Drop every guardian of a session, returning how many were removed.
    pub fn remove_session(&self, session_id: &Uuid) -> usize {
        let before = self.guardians.len();
        self.guardians.retain(|_, g| g.session_id != *session_id);
        before - self.guardians.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn guardian(session_id: Uuid, name: &str) -> Guardian {
        Guardian {
            id: Uuid::new_v4(),
            session_id,
            name: name.into(),
            guardian_type: GuardianType::Automated,
            responsibilities: vec![],
            authority: AuthorityLevel::Advise,
            scope: GuardianScope::default(),
            alert_threshold: 80.0,
            escalation: EscalationRule {
                after_failures: 2,
                notify: vec!["brand-lead".into()],
            },
            working_hours: None,
            performance: GuardianPerformance::default(),
            status: GuardianStatus::Active,
            load: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_working_hours() {
        // 2024-01-01 is a Monday.
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let office = WorkingHours {
            start_hour: 9,
            end_hour: 17,
            days: vec![Weekday::Mon, Weekday::Tue],
        };
        assert!(office.contains(at(9)));
        assert!(!office.contains(at(17)));
        assert!(!office.contains(Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap()));

        let night = WorkingHours {
            start_hour: 22,
            end_hour: 6,
            days: vec![],
        };
        assert!(night.contains(at(23)));
        assert!(night.contains(at(2)));
        assert!(!night.contains(at(12)));
    }

    #[test]
    fn test_acquire_prefers_least_loaded_active() {
        let table = GuardianTable::new();
        let session = Uuid::new_v4();
        let a = guardian(session, "a");
        let b = guardian(session, "b");
        let a_id = a.id;
        let b_id = b.id;
        table.insert(a);
        table.insert(b);

        let first = table.acquire(&session, Utc::now()).unwrap();
        let second = table.acquire(&session, Utc::now()).unwrap();
        assert_ne!(first.id, second.id);

        table.set_status(&a_id, GuardianStatus::Inactive).unwrap();
        table.set_status(&b_id, GuardianStatus::Maintenance).unwrap();
        assert!(table.acquire(&session, Utc::now()).is_none());

        table.release(&a_id);
        assert_eq!(table.get(&a_id).unwrap().load, 0);
    }

    #[test]
    fn test_record_check_alerts_and_escalates() {
        let table = GuardianTable::new();
        let g = guardian(Uuid::new_v4(), "a");
        let id = g.id;
        table.insert(g);

        let now = Utc::now();
        assert_eq!(
            table.record_check(&id, 50, now),
            Some(CheckRecord { alerted: true, escalated: false })
        );
        assert_eq!(
            table.record_check(&id, 40, now),
            Some(CheckRecord { alerted: true, escalated: true })
        );
        assert_eq!(
            table.record_check(&id, 95, now),
            Some(CheckRecord { alerted: false, escalated: false })
        );
        let perf = table.get(&id).unwrap().performance;
        assert_eq!(perf.checks_run, 3);
        assert_eq!(perf.alerts_raised, 2);
        assert_eq!(perf.escalations, 1);
        assert!((perf.average_score - 61.666).abs() < 0.01);
    }

    #[test]
    fn test_unknown_guardian_status_change() {
        let table = GuardianTable::new();
        let err = table
            .set_status(&Uuid::new_v4(), GuardianStatus::Active)
            .unwrap_err();
        assert!(matches!(err, BrandError::GuardianNotFound(_)));
    }

    #[test]
    fn test_remove_session() {
        let table = GuardianTable::new();
        let s1 = Uuid::new_v4();
        table.insert(guardian(s1, "a"));
        table.insert(guardian(s1, "b"));
        table.insert(guardian(Uuid::new_v4(), "c"));
        assert_eq!(table.remove_session(&s1), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_observe_guardian_counts_no_alerts() {
        let table = GuardianTable::new();
        let mut g = guardian(Uuid::new_v4(), "watcher");
        g.authority = AuthorityLevel::Observe;
        let id = g.id;
        table.insert(g);

        let now = Utc::now();
        for _ in 0..3 {
            assert_eq!(
                table.record_check(&id, 10, now),
                Some(CheckRecord { alerted: false, escalated: false })
            );
        }
        let perf = table.get(&id).unwrap().performance;
        assert_eq!(perf.checks_run, 3);
        assert_eq!(perf.alerts_raised, 0);
        assert_eq!(perf.escalations, 0);
    }
}
