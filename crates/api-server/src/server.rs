//! API server: HTTP REST endpoints plus the Prometheus metrics exporter.

use crate::monitoring_rest;
use crate::rest::{self, AppState};
use axum::routing::{get, post, put};
use axum::Router;
use brand_compliance::ComplianceEngine;
use brand_core::config::AppConfig;
use brand_monitoring::MonitoringManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the REST router over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Rules
        .route("/v1/rules", get(rest::list_rules).post(rest::create_rule))
        .route(
            "/v1/rules/:id",
            get(rest::get_rule).put(rest::update_rule).delete(rest::delete_rule),
        )
        // Validation
        .route("/v1/validate", post(rest::validate))
        .route("/v1/validate/realtime", post(rest::validate_realtime))
        .route("/v1/autofix", post(rest::auto_fix))
        .route("/v1/history/:brand_id", get(rest::history))
        // Monitoring
        .route("/v1/monitoring", post(monitoring_rest::setup_monitoring))
        .route(
            "/v1/monitoring/:id",
            get(monitoring_rest::get_monitoring).delete(monitoring_rest::teardown),
        )
        .route("/v1/monitoring/:id/check", post(monitoring_rest::run_check))
        .route("/v1/guardians/:id/status", put(monitoring_rest::set_guardian_status))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    engine: ComplianceEngine,
    monitoring: Arc<MonitoringManager>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        engine: ComplianceEngine,
        monitoring: Arc<MonitoringManager>,
    ) -> Self {
        Self {
            config,
            engine,
            monitoring,
        }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            engine: self.engine.clone(),
            monitoring: self.monitoring.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let app = router(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use brand_compliance::{RuleRegistry, ValidatorRegistry};
    use brand_core::config::{ComplianceConfig, MonitoringDefaults};
    use brand_core::event_bus::noop_sink;
    use brand_monitoring::StaticAssetSource;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let engine = ComplianceEngine::new(
            RuleRegistry::with_default_rules(),
            ValidatorRegistry::with_builtins(),
            ComplianceConfig::default(),
        )
        .with_sink(noop_sink());
        let monitoring = Arc::new(MonitoringManager::new(
            engine.clone(),
            Arc::new(StaticAssetSource::new()),
            noop_sink(),
            MonitoringDefaults::default(),
        ));
        router(AppState {
            engine,
            monitoring,
            node_id: "test-node".into(),
            start_time: Instant::now(),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rules"], 8);
    }

    #[tokio::test]
    async fn test_rule_crud() {
        let app = app();
        let rule = json!({
            "id": "cta-case",
            "name": "Call to action casing",
            "category": "tone",
            "severity": "info",
            "criteria": {"type": "pattern", "regex": "^[A-Z]"}
        });
        let (status, _) = send(&app, "POST", "/v1/rules", Some(rule.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "POST", "/v1/rules", Some(rule)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            send(&app, "PUT", "/v1/rules/cta-case", Some(json!({"priority": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["priority"], 2);

        let (status, _) = send(&app, "DELETE", "/v1/rules/cta-case", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", "/v1/rules/cta-case", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_rule_rejected() {
        let rule = json!({
            "id": "bad-range",
            "name": "Bad range",
            "category": "spacing",
            "severity": "warning",
            "criteria": {"type": "range", "min": 10, "max": 2}
        });
        let (status, body) = send(&app(), "POST", "/v1/rules", Some(rule)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("bad-range"));
    }

    #[tokio::test]
    async fn test_validate_and_history() {
        let app = app();
        let request = json!({
            "assets": [{"id": "hero", "properties": {"color": "#0052CC"}}],
            "brand": {"id": "acme", "colors": {"primary": ["#0052CC"]}},
            "options": {"include_rules": ["primary-color"]}
        });
        let (status, body) = send(&app, "POST", "/v1/validate", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overview"]["overall_score"], 100);

        let (status, body) = send(&app, "GET", "/v1/history/acme", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analytics"]["record_count"], 1);
    }

    #[tokio::test]
    async fn test_history_window_is_clamped() {
        let app = app();
        let request = json!({
            "assets": [{"id": "hero", "properties": {"color": "#0052CC"}}],
            "brand": {"id": "acme", "colors": {"primary": ["#0052CC"]}},
            "options": {"include_rules": ["primary-color"]}
        });
        let (status, _) = send(&app, "POST", "/v1/validate", Some(request)).await;
        assert_eq!(status, StatusCode::OK);

        for uri in [
            "/v1/history/acme?window_days=100000000",
            "/v1/history/acme?window_days=9223372036854775807",
            "/v1/history/acme?window_days=-5",
        ] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["analytics"]["record_count"], 1, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_monitoring_lifecycle() {
        let app = app();
        let request = json!({
            "brand": {"id": "acme"},
            "config": {"frequency": "daily", "guardians": [{"name": "watch"}]}
        });
        let (status, body) = send(&app, "POST", "/v1/monitoring", Some(request)).await;
        assert_eq!(status, StatusCode::CREATED);
        let session_id = body["session"]["id"].as_str().unwrap().to_string();
        let guardian_id = body["guardians"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/v1/guardians/{guardian_id}/status"),
            Some(json!({"status": "maintenance"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "maintenance");

        let (status, body) =
            send(&app, "POST", &format!("/v1/monitoring/{session_id}/check"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["report"].is_null());

        let (status, _) = send(&app, "DELETE", &format!("/v1/monitoring/{session_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/v1/monitoring/{session_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
