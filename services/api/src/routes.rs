use crate::infra::{AppState, Platform};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use rentwise::portfolio::portfolio_router;
use rentwise::workflows::applications::application_router;
use rentwise::workflows::billing::billing_router;
use rentwise::workflows::leasing::leasing_router;
use rentwise::workflows::maintenance::maintenance_router;
use rentwise::workflows::marketplace::marketplace_router;
use rentwise::workflows::reminders::reminder_router;
use rentwise::workflows::reporting::reporting_router;
use rentwise::workflows::team::team_router;
use serde_json::json;

pub(crate) fn with_platform_routes(platform: &Platform) -> Router {
    Router::new()
        .merge(portfolio_router(platform.portfolio.clone()))
        .merge(leasing_router(platform.leasing_state()))
        .merge(application_router(platform.applications.clone()))
        .merge(marketplace_router(platform.bookings.clone()))
        .merge(maintenance_router(platform.maintenance.clone()))
        .merge(billing_router(platform.billing.clone()))
        .merge(reminder_router(platform.reminders.clone()))
        .merge(reporting_router(platform.reporting_state()))
        .merge(team_router(platform.team.clone()))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rentwise::config::{
        AppConfig, AppEnvironment, LeasingConfig, LogFormat, ReminderConfig, ServerConfig,
        TelemetryConfig,
    };
    use rentwise::notifications::InMemoryMailer;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn config() -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
                format: LogFormat::Compact,
            },
            leasing: LeasingConfig::default(),
            reminders: ReminderConfig::default(),
        }
    }

    fn app(ready: bool) -> Router {
        let platform = Platform::in_memory(&config(), Arc::new(InMemoryMailer::default()));
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        };
        with_platform_routes(&platform).layer(Extension(state))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn readiness_reflects_startup() {
        let (status, body) = get_json(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (status, _) = get_json(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn every_workflow_is_mounted() {
        let (status, body) = get_json(app(true), "/api/v1/contractors").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = get_json(app(true), "/api/v1/leases/lease-missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json(app(true), "/api/v1/team/ll-missing/members").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
