//! Rule, result, and report data model for brand-compliance validation.

use brand_core::ValidationContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rule model
// ---------------------------------------------------------------------------

/// Area of the brand a rule governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Color,
    Typography,
    Spacing,
    Logo,
    Imagery,
    Tone,
    Layout,
    Accessibility,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 8] = [
        RuleCategory::Color,
        RuleCategory::Typography,
        RuleCategory::Spacing,
        RuleCategory::Logo,
        RuleCategory::Imagery,
        RuleCategory::Tone,
        RuleCategory::Layout,
        RuleCategory::Accessibility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleCategory::Color => "color",
            RuleCategory::Typography => "typography",
            RuleCategory::Spacing => "spacing",
            RuleCategory::Logo => "logo",
            RuleCategory::Imagery => "imagery",
            RuleCategory::Tone => "tone",
            RuleCategory::Layout => "layout",
            RuleCategory::Accessibility => "accessibility",
        }
    }

    /// Categories for which an automated correction exists.
    pub fn supports_auto_fix(self) -> bool {
        matches!(
            self,
            RuleCategory::Color | RuleCategory::Typography | RuleCategory::Spacing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub description: String,
    /// Contexts (platform, project type, or phase) the rule is limited to.
    /// Empty means every context.
    #[serde(default)]
    pub applicable_contexts: Vec<String>,
    /// Platforms, project types, or environments the rule never runs in.
    #[serde(default)]
    pub exemptions: Vec<String>,
    #[serde(default = "default_true")]
    pub measurable: bool,
}

fn default_true() -> bool {
    true
}

/// How a rule is evaluated. Closed set: adding a variant forces every
/// evaluator match to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Criteria {
    ExactMatch {
        #[serde(default)]
        allowed_values: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
    },
    Range {
        min: f64,
        max: f64,
        #[serde(default)]
        unit: Option<String>,
    },
    Pattern {
        regex: String,
        #[serde(default)]
        flags: String,
    },
    Custom {
        validator_function: String,
        #[serde(default)]
        parameters: Value,
    },
    AiAnalysis {
        model: String,
        prompt: String,
        #[serde(default = "default_confidence_threshold")]
        confidence_threshold: f64,
        #[serde(default)]
        fallback_validation: Option<Box<Criteria>>,
    },
}

fn default_confidence_threshold() -> f64 {
    0.7
}

impl Criteria {
    pub fn kind(&self) -> &'static str {
        match self {
            Criteria::ExactMatch { .. } => "exact-match",
            Criteria::Range { .. } => "range",
            Criteria::Pattern { .. } => "pattern",
            Criteria::Custom { .. } => "custom",
            Criteria::AiAnalysis { .. } => "ai-analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    /// Results carry evidence and per-result recommendations.
    #[default]
    Detailed,
    /// Results keep status and score but drop evidence and recommendations.
    Summary,
    /// Results still count toward scores but never surface as top issues,
    /// quick wins, or recommendations.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    Strict,
    #[default]
    Standard,
    Advisory,
    /// The rule stays registered but every evaluation is reported as skipped.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfiguration {
    /// Minimum passing score, 0–100.
    pub tolerance: f64,
    #[serde(default)]
    pub auto_fix: bool,
    #[serde(default)]
    pub report_level: ReportLevel,
    #[serde(default)]
    pub enforcement_level: EnforcementLevel,
}

impl Default for RuleConfiguration {
    fn default() -> Self {
        Self {
            tolerance: 80.0,
            auto_fix: false,
            report_level: ReportLevel::default(),
            enforcement_level: EnforcementLevel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImpactTier {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessMetadata {
    #[serde(default)]
    pub impact: ImpactTier,
    #[serde(default)]
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Default for BusinessMetadata {
    fn default() -> Self {
        Self {
            impact: ImpactTier::default(),
            stakeholders: Vec::new(),
            requires_approval: false,
            version: default_version(),
        }
    }
}

/// A single configurable brand check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandRule {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    /// Higher runs and ranks first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub definition: RuleDefinition,
    pub criteria: Criteria,
    #[serde(default)]
    pub configuration: RuleConfiguration,
    #[serde(default)]
    pub business: BusinessMetadata,
}

/// Partial update for a stored rule. Set fields replace the stored value
/// wholesale; the id is never changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulePatch {
    pub name: Option<String>,
    pub category: Option<RuleCategory>,
    pub severity: Option<Severity>,
    pub priority: Option<i32>,
    pub definition: Option<RuleDefinition>,
    pub criteria: Option<Criteria>,
    pub configuration: Option<RuleConfiguration>,
    pub business: Option<BusinessMetadata>,
}

impl RulePatch {
    /// Produce a new rule with this patch applied; `base` is left untouched.
    pub fn apply(&self, base: &BrandRule) -> BrandRule {
        BrandRule {
            id: base.id.clone(),
            name: self.name.clone().unwrap_or_else(|| base.name.clone()),
            category: self.category.unwrap_or(base.category),
            severity: self.severity.unwrap_or(base.severity),
            priority: self.priority.unwrap_or(base.priority),
            definition: self
                .definition
                .clone()
                .unwrap_or_else(|| base.definition.clone()),
            criteria: self.criteria.clone().unwrap_or_else(|| base.criteria.clone()),
            configuration: self
                .configuration
                .clone()
                .unwrap_or_else(|| base.configuration.clone()),
            business: self.business.clone().unwrap_or_else(|| base.business.clone()),
        }
    }
}

/// Caller-side narrowing of the applicable rule set for one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// If non-empty, only these rule ids run.
    #[serde(default)]
    pub include_rules: Vec<String>,
    #[serde(default)]
    pub exclude_rules: Vec<String>,
    /// If non-empty, only rules with one of these severities run.
    #[serde(default)]
    pub severity_filter: Vec<Severity>,
    /// If non-empty, only rules in these categories run.
    #[serde(default)]
    pub categories: Vec<RuleCategory>,
}

// ---------------------------------------------------------------------------
// Validation results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pass,
    Fail,
    Warning,
    Error,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultContext {
    /// Id of the asset the rule was evaluated against.
    pub element_id: String,
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub validator: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMeta {
    pub evaluation_us: u64,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: String,
    pub description: String,
    pub value: Value,
}

/// Outcome of evaluating one rule against one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub status: ValidationStatus,
    /// 0–100.
    pub score: f64,
    /// 0–1.
    pub confidence: f64,
    pub actual_value: Value,
    pub expected_value: Value,
    /// 0–100.
    pub deviation: f64,
    pub context: ResultContext,
    pub message: String,
    pub recommendations: Vec<String>,
    pub auto_fix_available: bool,
    pub performance: PerformanceMeta,
    pub evidence: Vec<Evidence>,
}

impl ValidationResult {
    pub fn asset_id(&self) -> &str {
        &self.context.element_id
    }
}

// ---------------------------------------------------------------------------
// Compliance report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl ComplianceLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => ComplianceLevel::Excellent,
            80..=89 => ComplianceLevel::Good,
            70..=79 => ComplianceLevel::Fair,
            60..=69 => ComplianceLevel::Poor,
            _ => ComplianceLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score > 80 {
            RiskLevel::Low
        } else if score > 60 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceOverview {
    pub total_assets: usize,
    pub total_rules: usize,
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub errors: usize,
    pub skipped: usize,
    pub overall_score: u32,
    pub compliance_level: ComplianceLevel,
    pub risk_level: RiskLevel,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: RuleCategory,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub score: u32,
    pub top_issues: Vec<String>,
    pub quick_wins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub rule_id: String,
    pub rule_name: String,
    pub asset_id: String,
    pub category: RuleCategory,
    pub priority: RecommendationPriority,
    pub title: String,
    pub description: String,
    pub business_impact: String,
    pub brand_impact: String,
    pub user_impact: String,
    pub implementation_effort: EffortTier,
    pub success_criteria: Vec<String>,
    pub kpis: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Open,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub title: String,
    pub description: String,
    pub owner: Option<String>,
    pub due_date: DateTime<Utc>,
    pub estimated_effort_hours: u32,
    pub acceptance_criteria: Vec<String>,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    pub level: ComplianceLevel,
    pub issued_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Aggregate output of one validation pass. Never mutated after it is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub id: Uuid,
    pub brand_id: String,
    pub context: ValidationContext,
    pub overview: ComplianceOverview,
    pub rule_results: Vec<ValidationResult>,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub recommendations: Vec<Recommendation>,
    pub action_items: Vec<ActionItem>,
    pub certifications: Vec<Certification>,
}

/// Output of the real-time single-asset path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeReport {
    pub asset_id: String,
    pub results: Vec<ValidationResult>,
    pub rules_selected: usize,
    /// True when evaluation stopped at a critical-impact error.
    pub halted_early: bool,
    pub critical_failures: usize,
    pub alert_sent: bool,
    pub duration_ms: u64,
}
