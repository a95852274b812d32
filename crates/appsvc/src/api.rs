//! HTTP API: catalog and session endpoints plus health and Prometheus metrics

use appsvc_core::{
    error::codes, AppError, AppService, ComponentStatus, PauseAppRequest, ResumeAppRequest,
    RunAppRequest, SearchAppsAclRequest, SearchAppsRequest, StopAppRequest,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
}

impl AppState {
    pub fn new(service: Arc<AppService>) -> Self {
        Self { service }
    }
}

/// JSON error body `{"code": ..., "message": ...}`
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let code = err.code();
        let (status, message) = match &err {
            e if e.is_business() => (StatusCode::CONFLICT, e.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => {
                error!(error = %other, "Unhandled error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "code": codes::UNKNOWN, "message": "unknown error" })),
                )
                    .into_response();
            }
        };
        error!(code, message = %message, "Request failed");

        (status, Json(json!({ "code": code, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Gets app release details
async fn get_app_release(
    State(state): State<AppState>,
    Path(release_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let release = state.service.get_app_release(&release_id).await?;
    Ok(Json(release))
}

/// Search apps
async fn search_apps(
    State(state): State<AppState>,
    body: Result<Json<SearchAppsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let apps = state.service.search_apps(&req).await?;
    Ok(Json(json!({ "apps": apps })))
}

/// Search apps helper: auto-complete lists
async fn search_apps_acl(
    State(state): State<AppState>,
    body: Result<Json<SearchAppsAclRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let acl = state.service.search_apps_acl(&req).await?;
    Ok(Json(json!({ "acl": acl })))
}

/// Runs a new app
async fn run_app(
    State(state): State<AppState>,
    body: Result<Json<RunAppRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let res = state.service.run_app(&req).await?;
    Ok(Json(res))
}

/// Pauses a running app
async fn pause_app(
    State(state): State<AppState>,
    body: Result<Json<PauseAppRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    state.service.pause_app(&req).await?;
    Ok(StatusCode::OK)
}

/// Resumes a paused app with a new set of ws_conn parameters
async fn resume_app(
    State(state): State<AppState>,
    body: Result<Json<ResumeAppRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    state.service.resume_app(&req).await?;
    Ok(StatusCode::OK)
}

/// Stops a running app
async fn stop_app(
    State(state): State<AppState>,
    body: Result<Json<StopAppRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    state.service.stop_app(&req).await?;
    Ok(StatusCode::OK)
}

/// Health check: 200 while operational, 503 once a component is unhealthy
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.service.health().health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let readiness = state.service.health().readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/apps/search", post(search_apps))
        .route("/apps/search/acl", post(search_apps_acl))
        .route("/apps/run", post(run_app))
        .route("/apps/pause", post(pause_app))
        .route("/apps/resume", post(resume_app))
        .route("/apps/stop", post(stop_app))
        .route("/apps/:release_id", get(get_app_release))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
