//! Monitoring session and guardian REST API endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use brand_core::{BrandIdentity, ValidationContext};
use brand_monitoring::{CheckOutcome, Guardian, GuardianStatus, MonitoringConfig, MonitoringSession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rest::{from_brand_error, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SetupMonitoringRequest {
    pub brand: BrandIdentity,
    #[serde(default)]
    pub context: Option<ValidationContext>,
    #[serde(default)]
    pub config: MonitoringConfig,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: MonitoringSession,
    pub guardians: Vec<Guardian>,
}

/// POST /v1/monitoring: Start a monitoring session.
pub async fn setup_monitoring(
    State(state): State<AppState>,
    Json(req): Json<SetupMonitoringRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let context = req
        .context
        .unwrap_or_else(|| ValidationContext::for_brand(req.brand.id.clone()));
    let session = state
        .monitoring
        .setup_monitoring(req.brand, context, req.config)
        .map_err(from_brand_error)?;
    metrics::counter!("api.monitoring.sessions").increment(1);
    let guardians = state.monitoring.guardians(&session.id);
    Ok((StatusCode::CREATED, Json(SessionResponse { session, guardians })))
}

/// GET /v1/monitoring/:id: Session state with its guardians.
pub async fn get_monitoring(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, StatusCode> {
    let session = state
        .monitoring
        .get_session(&id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let guardians = state.monitoring.guardians(&id);
    Ok(Json(SessionResponse { session, guardians }))
}

/// POST /v1/monitoring/:id/check: Run a check now.
pub async fn run_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckOutcome>, ApiError> {
    state
        .monitoring
        .run_check(id)
        .await
        .map(Json)
        .map_err(from_brand_error)
}

/// DELETE /v1/monitoring/:id: Stop a session.
pub async fn teardown(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .monitoring
        .teardown(&id)
        .map_err(from_brand_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct GuardianStatusRequest {
    pub status: GuardianStatus,
}

/// PUT /v1/guardians/:id/status: Change a guardian's status.
pub async fn set_guardian_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<GuardianStatusRequest>,
) -> Result<Json<Guardian>, ApiError> {
    state
        .monitoring
        .set_guardian_status(&id, req.status)
        .map(Json)
        .map_err(from_brand_error)
}
