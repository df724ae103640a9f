use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use certainty_common::types::{CertificateMonitor, CreateMonitorRequest};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::render_prometheus;
use super::MonitorError;

#[derive(Serialize)]
struct ApiError {
    error: String,
    code: String,
}

fn error_response(status: StatusCode, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiError {
            error: msg.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

/// Extractor rejections (bad JSON, missing fields, bad query) as `invalid_request`.
fn rejection_response(rejection: impl std::fmt::Display) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_request",
        &rejection.to_string(),
    )
}

fn monitor_error(err: MonitorError) -> Response {
    match &err {
        MonitorError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", &err.to_string())
        }
        MonitorError::Validation(_) => {
            error_response(StatusCode::BAD_REQUEST, "invalid_request", &err.to_string())
        }
        MonitorError::Storage(e) => {
            tracing::error!(error = %e, "Storage failure while serving request");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                &format!("Storage error: {e}"),
            )
        }
    }
}

/// A monitor as returned by the API, with the derived time left.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorResponse {
    #[serde(flatten)]
    pub monitor: CertificateMonitor,
    pub time_remaining_secs: Option<i64>,
}

impl From<CertificateMonitor> for MonitorResponse {
    fn from(monitor: CertificateMonitor) -> Self {
        let time_remaining_secs = monitor.time_remaining(Utc::now()).map(|d| d.num_seconds());
        Self {
            monitor,
            time_remaining_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    email: String,
}

#[derive(Debug, Deserialize)]
struct SetEnabledRequest {
    enabled: bool,
}

// POST /api/monitors
async fn create_monitor(
    State(state): State<AppState>,
    payload: Result<Json<CreateMonitorRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    let created = match state.service.create(req) {
        Ok(m) => m,
        Err(e) => return monitor_error(e),
    };

    match state.engine.refresh(&created.id).await {
        Ok(refreshed) => (StatusCode::CREATED, Json(MonitorResponse::from(refreshed))).into_response(),
        Err(e) => monitor_error(e),
    }
}

// GET /api/monitors?email=
async fn list_monitors(
    State(state): State<AppState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match state.service.list_for_owner(&query.email) {
        Ok(monitors) => {
            let body: Vec<MonitorResponse> = monitors.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(e) => monitor_error(e),
    }
}

// GET /api/monitors/:id
async fn get_monitor(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.service.get(&id) {
        Ok(m) => Json(MonitorResponse::from(m)).into_response(),
        Err(e) => monitor_error(e),
    }
}

// POST /api/monitors/:id/refresh
async fn refresh_monitor(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let floor = Duration::seconds(state.config.refresh.manual_floor_secs as i64);
    match state.engine.refresh_if_stale(&id, floor).await {
        Ok(m) => Json(MonitorResponse::from(m)).into_response(),
        Err(e) => monitor_error(e),
    }
}

// PUT /api/monitors/:id/enabled
async fn set_enabled(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SetEnabledRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match state.service.set_enabled(&id, req.enabled) {
        Ok(m) => Json(MonitorResponse::from(m)).into_response(),
        Err(e) => monitor_error(e),
    }
}

// DELETE /api/monitors/:id
async fn delete_monitor(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.service.delete(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => monitor_error(e),
    }
}

// GET /monitor/:id/prometheus
async fn prometheus_metrics(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.service.get(&id) {
        Ok(m) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render_prometheus(&m, Utc::now()),
        )
            .into_response(),
        Err(e) => monitor_error(e),
    }
}

pub fn monitor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/monitors", post(create_monitor).get(list_monitors))
        .route("/api/monitors/:id", get(get_monitor).delete(delete_monitor))
        .route("/api/monitors/:id/refresh", post(refresh_monitor))
        .route("/api/monitors/:id/enabled", put(set_enabled))
        .route("/monitor/:id/prometheus", get(prometheus_metrics))
}
