//! REST API handlers for rule management, validation passes, and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use brand_compliance::{
    AutoFixSummary, BrandRule, ComplianceEngine, ComplianceReport, HistoryAnalytics,
    HistoryRecord, RealtimeReport, RulePatch, ValidationOptions, ValidationResult,
};
use brand_core::{Asset, BrandError, BrandIdentity, ValidationContext};
use brand_monitoring::MonitoringManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Maximum number of assets accepted in one validation request.
const MAX_ASSETS: usize = 500;

/// Widest history window a request may ask for.
const MAX_HISTORY_WINDOW_DAYS: i64 = 3650;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: ComplianceEngine,
    pub monitoring: Arc<MonitoringManager>,
    pub node_id: String,
    pub start_time: Instant,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Map a domain error onto an HTTP status.
pub(crate) fn from_brand_error(e: BrandError) -> ApiError {
    let (status, code) = match &e {
        BrandError::InvalidRule { .. }
        | BrandError::Config(_)
        | BrandError::UnsupportedCriteria(_)
        | BrandError::Serialization(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        BrandError::DuplicateRule(_) => (StatusCode::CONFLICT, "duplicate_rule"),
        BrandError::RuleNotFound(_)
        | BrandError::GuardianNotFound(_)
        | BrandError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "request failed");
        metrics::counter!("api.errors").increment(1);
    }
    api_error(status, code, e.to_string())
}

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        rules: state.engine.registry().len(),
    })
}

// ─── Rules ─────────────────────────────────────────────────────────────────

pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<BrandRule>> {
    Json(state.engine.registry().snapshot().as_ref().clone())
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BrandRule>, StatusCode> {
    state
        .engine
        .registry()
        .get(&id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(rule): Json<BrandRule>,
) -> Result<(StatusCode, Json<BrandRule>), ApiError> {
    state
        .engine
        .registry()
        .add_rule(rule.clone())
        .map_err(from_brand_error)?;
    metrics::counter!("api.rules.created").increment(1);
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<RulePatch>,
) -> Result<Json<BrandRule>, ApiError> {
    state
        .engine
        .registry()
        .update_rule(&id, &patch)
        .map(Json)
        .map_err(from_brand_error)
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .registry()
        .remove_rule(&id)
        .map_err(from_brand_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Validation ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub assets: Vec<Asset>,
    pub brand: BrandIdentity,
    #[serde(default)]
    pub context: Option<ValidationContext>,
    #[serde(default)]
    pub options: ValidationOptions,
}

/// POST /v1/validate: Full validation pass.
pub async fn validate(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ComplianceReport>, ApiError> {
    if req.assets.len() > MAX_ASSETS {
        warn!(assets = req.assets.len(), "validation request too large");
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "too_many_assets",
            format!("at most {MAX_ASSETS} assets per request"),
        ));
    }
    let context = req
        .context
        .unwrap_or_else(|| ValidationContext::for_brand(req.brand.id.clone()));
    state
        .engine
        .validate(&req.assets, &req.brand, &context, &req.options)
        .await
        .map(Json)
        .map_err(from_brand_error)
}

#[derive(Debug, Deserialize)]
pub struct RealtimeRequest {
    pub asset: Asset,
    pub brand: BrandIdentity,
    #[serde(default)]
    pub context: Option<ValidationContext>,
    #[serde(default)]
    pub rule_ids: Option<Vec<String>>,
}

/// POST /v1/validate/realtime: Single-asset check with early exit.
pub async fn validate_realtime(
    State(state): State<AppState>,
    Json(req): Json<RealtimeRequest>,
) -> Result<Json<RealtimeReport>, ApiError> {
    let context = req
        .context
        .unwrap_or_else(|| ValidationContext::for_brand(req.brand.id.clone()));
    state
        .engine
        .validate_realtime(&req.asset, &req.brand, &context, req.rule_ids.as_deref())
        .await
        .map(Json)
        .map_err(from_brand_error)
}

#[derive(Debug, Deserialize)]
pub struct AutoFixRequest {
    pub results: Vec<ValidationResult>,
    pub brand: BrandIdentity,
    pub cap: Option<usize>,
}

/// POST /v1/autofix: Apply corrections for a prior pass's failures.
pub async fn auto_fix(
    State(state): State<AppState>,
    Json(req): Json<AutoFixRequest>,
) -> Json<AutoFixSummary> {
    let summary = state.engine.auto_fix(&req.results, &req.brand, req.cap).await;
    info!(attempted = summary.attempted, successful = summary.successful, "auto-fix request handled");
    Json(summary)
}

// ─── History ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub window_days: Option<i64>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub records: Vec<HistoryRecord>,
    pub analytics: HistoryAnalytics,
}

/// GET /v1/history/:brand_id: Records and analytics over a window (default
/// 30 days, at most ten years).
pub async fn history(
    State(state): State<AppState>,
    Path(brand_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let days = query
        .window_days
        .unwrap_or(30)
        .clamp(1, MAX_HISTORY_WINDOW_DAYS);
    let window = chrono::Duration::days(days);
    let history = state.engine.history();
    Json(HistoryResponse {
        records: history.query(&brand_id, chrono::Utc::now().checked_sub_signed(window)),
        analytics: history.analytics(&brand_id, window),
    })
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub rules: usize,
}
