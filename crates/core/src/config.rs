use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `BRAND_GUARDIAN__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub monitoring: MonitoringDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "guardian-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            compliance: ComplianceConfig::default(),
            monitoring: MonitoringDefaults::default(),
        }
    }
}

// ─── Compliance Config ──────────────────────────────────────────────────

/// Caps and timeouts for validation passes. The defaults reproduce the
/// historical behaviour of the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
    #[serde(default = "default_max_top_issues")]
    pub max_top_issues: usize,
    #[serde(default = "default_max_quick_wins")]
    pub max_quick_wins: usize,
    #[serde(default = "default_action_item_due_days")]
    pub action_item_due_days: i64,
    #[serde(default = "default_auto_fix_cap")]
    pub auto_fix_cap: usize,
    #[serde(default = "default_ai_timeout_ms")]
    pub ai_timeout_ms: u64,
    #[serde(default = "default_realtime_rule_limit")]
    pub realtime_rule_limit: usize,
    #[serde(default = "default_realtime_priority_threshold")]
    pub realtime_priority_threshold: i32,
    #[serde(default = "default_certification_threshold")]
    pub certification_threshold: u32,
    #[serde(default = "default_certification_validity_days")]
    pub certification_validity_days: i64,
    #[serde(default = "default_parallel_assets")]
    pub parallel_assets: bool,
    /// Oldest history records are evicted past this many.
    #[serde(default = "default_history_max_records")]
    pub history_max_records: usize,
}

fn default_max_recommendations() -> usize {
    10
}
fn default_max_top_issues() -> usize {
    3
}
fn default_max_quick_wins() -> usize {
    3
}
fn default_action_item_due_days() -> i64 {
    7
}
fn default_auto_fix_cap() -> usize {
    50
}
fn default_ai_timeout_ms() -> u64 {
    5000
}
fn default_realtime_rule_limit() -> usize {
    10
}
fn default_realtime_priority_threshold() -> i32 {
    8
}
fn default_certification_threshold() -> u32 {
    80
}
fn default_certification_validity_days() -> i64 {
    90
}
fn default_parallel_assets() -> bool {
    true
}
fn default_history_max_records() -> usize {
    10_000
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            max_recommendations: default_max_recommendations(),
            max_top_issues: default_max_top_issues(),
            max_quick_wins: default_max_quick_wins(),
            action_item_due_days: default_action_item_due_days(),
            auto_fix_cap: default_auto_fix_cap(),
            ai_timeout_ms: default_ai_timeout_ms(),
            realtime_rule_limit: default_realtime_rule_limit(),
            realtime_priority_threshold: default_realtime_priority_threshold(),
            certification_threshold: default_certification_threshold(),
            certification_validity_days: default_certification_validity_days(),
            parallel_assets: default_parallel_assets(),
            history_max_records: default_history_max_records(),
        }
    }
}

// ─── Monitoring Config ──────────────────────────────────────────────────

/// Fallbacks used when a monitoring session request leaves a field unset.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringDefaults {
    #[serde(default = "default_frequency")]
    pub default_frequency: String,
    #[serde(default = "default_alert_threshold")]
    pub default_alert_threshold: f64,
    #[serde(default = "default_escalation_after_failures")]
    pub escalation_after_failures: u32,
}

fn default_frequency() -> String {
    "weekly".to_string()
}
fn default_alert_threshold() -> f64 {
    80.0
}
fn default_escalation_after_failures() -> u32 {
    3
}

impl Default for MonitoringDefaults {
    fn default() -> Self {
        Self {
            default_frequency: default_frequency(),
            default_alert_threshold: default_alert_threshold(),
            escalation_after_failures: default_escalation_after_failures(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("BRAND_GUARDIAN")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
