use std::net::SocketAddr;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{ErrorCode, MonitorError, MonitorErrorCodes};
use crate::managers::{AnalyticsSummary, Evaluation};
use crate::records::{
    CalibrationProfile, CalibrationRequest, MonitoringSession, NewPatient, Patient,
    PatientUpdate, SensorReadingRequest, SensorSample, StopSessionRequest,
};
use crate::telemetry::{self, MetricEvent};

use super::metrics::render_prometheus_metrics;
use super::state::HttpState;

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/device/sensor-data", post(ingest_sensor_data))
        .route("/api/device/readings/:patient_id", get(recent_readings))
        .route("/api/device/calibrate", post(calibrate))
        .route("/api/device/calibration/:patient_id", get(active_calibration))
        .route("/api/monitoring/current/:patient_id", get(current_status))
        .route("/api/monitoring/start", post(start_session))
        .route("/api/monitoring/stop/:session_id", post(stop_session))
        .route("/api/analytics/sessions/:patient_id", get(session_history))
        .route("/api/analytics/summary/:patient_id", get(session_summary))
        .route("/api/patients", get(list_patients).post(create_patient))
        .route("/api/patients/:patient_id", get(get_patient).put(update_patient))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn run_http_server(
    state: HttpState,
    addr: SocketAddr,
    shutdown: oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", addr))?;
    log::info!("[HTTP] Listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
        })
        .await
        .context("serving HTTP router")?;

    log::info!("[HTTP] Server stopped");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub patient_id: Uuid,
}

#[derive(Debug)]
pub enum HttpServerError {
    NotFound(String),
    BadRequest(String),
    /// Details are logged server side and never returned to the client
    Internal,
}

impl From<MonitorError> for HttpServerError {
    fn from(err: MonitorError) -> Self {
        telemetry::hub().record_error(&err, "http");
        match err {
            MonitorError::NotFound { .. } => Self::NotFound(err.message()),
            MonitorError::Validation { .. } => Self::BadRequest(err.message()),
            MonitorError::Store { .. } => {
                log::error!("[HTTP] {}", err);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_ms: u64,
    pub telemetry_events: u64,
    pub dropped_events: u64,
    pub last_error: Option<String>,
}

/// Summary body, or a message when the patient has no completed sessions
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SummaryResponse {
    Summary(AnalyticsSummary),
    NoData { message: &'static str },
}

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    let snapshot = telemetry::hub().snapshot();
    let last_error = snapshot.recent.iter().rev().find_map(|event| match event {
        MetricEvent::Error { code, context } => Some((*code, context.clone())),
        _ => None,
    });

    // Only store failures degrade health; 404/400 are client mistakes.
    let status = match last_error {
        Some((code, _)) if code == MonitorErrorCodes::STORE => "degraded",
        _ => "ok",
    };

    Json(HealthResponse {
        status,
        uptime_ms: state.uptime_ms(),
        telemetry_events: snapshot.total_events,
        dropped_events: snapshot.dropped_events,
        last_error: last_error.map(|(code, context)| format!("{}:{}", code, context)),
    })
}

pub async fn metrics(State(state): State<HttpState>) -> Response {
    let snapshot = telemetry::hub().snapshot();
    let body = render_prometheus_metrics(&state, &snapshot);
    let mut response = body.into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}

pub async fn ingest_sensor_data(
    State(state): State<HttpState>,
    Json(request): Json<SensorReadingRequest>,
) -> Result<Json<Evaluation>, HttpServerError> {
    let evaluation = state.context().monitoring().ingest(request)?;
    Ok(Json(evaluation))
}

pub async fn recent_readings(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SensorSample>>, HttpServerError> {
    let context = state.context();
    let limit = query
        .limit
        .unwrap_or(context.config().analytics.readings_limit);
    Ok(Json(context.monitoring().recent(patient_id, limit)?))
}

pub async fn current_status(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Evaluation>, HttpServerError> {
    Ok(Json(state.context().monitoring().current(patient_id)?))
}

pub async fn calibrate(
    State(state): State<HttpState>,
    Json(request): Json<CalibrationRequest>,
) -> Result<(StatusCode, Json<CalibrationProfile>), HttpServerError> {
    let profile = state.context().calibration().activate(request)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn active_calibration(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<CalibrationProfile>, HttpServerError> {
    state
        .context()
        .calibration()
        .get_active(patient_id)?
        .map(Json)
        .ok_or_else(|| MonitorError::not_found("Calibration", patient_id).into())
}

pub async fn start_session(
    State(state): State<HttpState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<MonitoringSession>), HttpServerError> {
    let session = state.context().sessions().start(request.patient_id)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// The summary body is optional; an empty body stops with no caller values.
pub async fn stop_session(
    State(state): State<HttpState>,
    Path(session_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<MonitoringSession>, HttpServerError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StopSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            HttpServerError::BadRequest(format!("invalid stop payload: {}", err))
        })?
    };
    Ok(Json(state.context().sessions().stop(session_id, request)?))
}

pub async fn session_history(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<MonitoringSession>>, HttpServerError> {
    let context = state.context();
    let limit = query
        .limit
        .unwrap_or(context.config().analytics.history_limit);
    Ok(Json(context.sessions().history(patient_id, limit)?))
}

pub async fn session_summary(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<SummaryResponse>, HttpServerError> {
    let context = state.context();
    let limit = query
        .limit
        .unwrap_or(context.config().analytics.summary_limit);
    let response = match context.sessions().summarize(patient_id, limit)? {
        Some(summary) => SummaryResponse::Summary(summary),
        None => SummaryResponse::NoData {
            message: "No session data available",
        },
    };
    Ok(Json(response))
}

pub async fn create_patient(
    State(state): State<HttpState>,
    Json(new_patient): Json<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), HttpServerError> {
    let patient = state.context().patients().create(new_patient)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn list_patients(
    State(state): State<HttpState>,
) -> Result<Json<Vec<Patient>>, HttpServerError> {
    Ok(Json(state.context().patients().list()?))
}

pub async fn get_patient(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Patient>, HttpServerError> {
    Ok(Json(state.context().patients().get(patient_id)?))
}

pub async fn update_patient(
    State(state): State<HttpState>,
    Path(patient_id): Path<Uuid>,
    Json(update): Json<PatientUpdate>,
) -> Result<Json<Patient>, HttpServerError> {
    Ok(Json(state.context().patients().update(patient_id, update)?))
}
