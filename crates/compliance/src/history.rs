//! Append-only validation history and the analytics derived from it.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ComplianceReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub brand_id: String,
    pub report_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub score: u32,
    pub result_count: usize,
    pub summary: HistorySummary,
}

impl HistoryRecord {
    pub fn from_report(report: &ComplianceReport) -> Self {
        let o = &report.overview;
        Self {
            id: Uuid::new_v4(),
            brand_id: report.brand_id.clone(),
            report_id: report.id,
            timestamp: o.completed_at,
            score: o.overall_score,
            result_count: o.total_checks,
            summary: HistorySummary {
                passed: o.passed,
                failed: o.failed,
                warnings: o.warnings,
                errors: o.errors,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryAnalytics {
    pub brand_id: String,
    pub record_count: usize,
    pub average_score: f64,
    pub trend: Trend,
    pub insights: Vec<String>,
    pub predicted_next_score: Option<f64>,
}

/// Half-average difference that counts as a real movement.
const TREND_THRESHOLD: f64 = 5.0;

/// Retained when no explicit cap is given.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

pub struct ValidationHistory {
    records: RwLock<VecDeque<HistoryRecord>>,
    max_records: usize,
}

impl Default for ValidationHistory {
    fn default() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }
}

impl ValidationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `max_records`, dropping the oldest first.
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn append(&self, record: HistoryRecord) {
        let mut records = self.records.write();
        while records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Records for `brand_id` at or after `since`, oldest first.
    pub fn query(&self, brand_id: &str, since: Option<DateTime<Utc>>) -> Vec<HistoryRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.brand_id == brand_id)
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .cloned()
            .collect()
    }

    /// Analytics over the records inside `window`. A window reaching past
    /// the representable time range covers the whole history.
    pub fn analytics(&self, brand_id: &str, window: Duration) -> HistoryAnalytics {
        let since = Utc::now().checked_sub_signed(window);
        let records = self.query(brand_id, since);
        let scores: Vec<f64> = records.iter().map(|r| r.score as f64).collect();
        analyze(brand_id, &scores)
    }
}

/// Analytics over a chronological score series.
pub fn analyze(brand_id: &str, scores: &[f64]) -> HistoryAnalytics {
    let average_score = mean(scores).unwrap_or(0.0);
    let trend = trend(scores);
    let predicted_next_score = predict_next(scores);

    let mut insights = Vec::new();
    if scores.is_empty() {
        insights.push("No validation history in this window".to_string());
    } else {
        match trend {
            Trend::Improving => insights.push("Compliance is improving across recent passes".to_string()),
            Trend::Declining => insights.push("Compliance is declining; review recent asset changes".to_string()),
            Trend::Stable => insights.push("Compliance is stable".to_string()),
        }
        if average_score < 60.0 {
            insights.push("Average score is below the poor threshold".to_string());
        } else if average_score >= 90.0 {
            insights.push("Average score is in the excellent band".to_string());
        }
    }

    HistoryAnalytics {
        brand_id: brand_id.to_string(),
        record_count: scores.len(),
        average_score,
        trend,
        insights,
        predicted_next_score,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Compare the first and second half averages.
fn trend(scores: &[f64]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }
    let mid = scores.len() / 2;
    let (first, second) = scores.split_at(mid);
    let delta = mean(second).unwrap_or(0.0) - mean(first).unwrap_or(0.0);
    if delta > TREND_THRESHOLD {
        Trend::Improving
    } else if delta < -TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Least-squares line through (index, score), evaluated one step ahead.
fn predict_next(scores: &[f64]) -> Option<f64> {
    let n = scores.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = mean(scores)?;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in scores.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    let slope = num / den;
    let next = mean_y + slope * (nf - mean_x);
    Some(next.clamp(0.0, 100.0))
}
