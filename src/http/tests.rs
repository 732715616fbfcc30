use super::handlers::*;
use super::state::HttpState;
use crate::context::AppContext;
use axum::body::{to_bytes, Body};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn make_router() -> Router {
    build_router(HttpState::new(AppContext::default()))
}

async fn response_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    let json = serde_json::from_slice::<Value>(&bytes).expect("JSON body");
    (status, json)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    response_json(router.clone().oneshot(request).await.expect("router call")).await
}

async fn create_patient(router: &Router) -> String {
    let (status, json) = send(
        router,
        Method::POST,
        "/api/patients",
        Some(json!({
            "full_name": "Ada Patient",
            "age": 67,
            "stroke_side": "left",
            "severity_level": 3,
            "mobility_level": "cane"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().expect("patient id").to_string()
}

fn reading(patient_id: &str, pitch: f64) -> Value {
    json!({
        "patient_id": patient_id,
        "device_id": "vest-01",
        "imu_pitch": pitch,
        "imu_roll": 0.0,
        "fsr_left": 0.0,
        "fsr_right": 0.0
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, json) = send(&make_router(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["uptime_ms"].is_u64());
}

#[tokio::test]
async fn metrics_are_prometheus_text() {
    let response = make_router()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("metrics request"),
        )
        .await
        .expect("metrics call");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("metrics body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8 metrics");
    assert!(text.contains("# TYPE posture_events_total counter"));
}

#[tokio::test]
async fn uncalibrated_ingest_is_unsafe() {
    let router = make_router();
    let patient_id = create_patient(&router).await;

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/device/sensor-data",
        Some(reading(&patient_id, 20.0)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"]["alert_level"], "unsafe");
    assert_eq!(json["status"]["balance"], 0.0);
    assert_eq!(json["status"]["haptic_active"], true);
    assert_eq!(json["status"]["tilt_direction"], "forward");
}

#[tokio::test]
async fn negative_pressure_is_bad_request() {
    let router = make_router();
    let patient_id = create_patient(&router).await;
    let mut body = reading(&patient_id, 1.0);
    body["fsr_left"] = json!(-4.0);

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/device/sensor-data",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("fsr_left"));
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let router = make_router();
    let uri = format!("/api/patients/{}", uuid::Uuid::new_v4());
    let (status, json) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().starts_with("Patient not found"));
}

#[tokio::test]
async fn current_without_readings_is_not_found() {
    let router = make_router();
    let patient_id = create_patient(&router).await;
    let uri = format!("/api/monitoring/current/{patient_id}");
    let (status, _) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn calibration_supersedes_and_applies() {
    let router = make_router();
    let patient_id = create_patient(&router).await;

    let uri = format!("/api/device/calibration/{patient_id}");
    let (status, _) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for (warning, danger) in [(6.0, 12.0), (25.0, 30.0)] {
        let (status, json) = send(
            &router,
            Method::POST,
            "/api/device/calibrate",
            Some(json!({
                "patient_id": patient_id,
                "baseline_pitch": 0.0,
                "baseline_roll": 0.0,
                "warning_threshold": warning,
                "danger_threshold": danger
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["is_active"], true);
    }

    let (status, json) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["warning_threshold"], 25.0);

    let (_, json) = send(
        &router,
        Method::POST,
        "/api/device/sensor-data",
        Some(reading(&patient_id, 20.0)),
    )
    .await;
    assert_eq!(json["status"]["alert_level"], "safe");

    let uri = format!("/api/monitoring/current/{patient_id}");
    let (status, json) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sample"]["imu_pitch"], 20.0);
}

#[tokio::test]
async fn inverted_thresholds_are_bad_request() {
    let router = make_router();
    let patient_id = create_patient(&router).await;
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/device/calibrate",
        Some(json!({
            "patient_id": patient_id,
            "baseline_pitch": 0.0,
            "baseline_roll": 0.0,
            "warning_threshold": 20.0,
            "danger_threshold": 10.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_lifecycle_and_summary() {
    let router = make_router();
    let patient_id = create_patient(&router).await;

    let summary_uri = format!("/api/analytics/summary/{patient_id}");
    let (status, json) = send(&router, Method::GET, &summary_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No session data available");

    let (status, session) = send(
        &router,
        Method::POST,
        "/api/monitoring/start",
        Some(json!({ "patient_id": patient_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(session["end_time"].is_null());

    let stop_uri = format!("/api/monitoring/stop/{}", session["id"].as_str().unwrap());
    let (status, stopped) = send(
        &router,
        Method::POST,
        &stop_uri,
        Some(json!({
            "duration_minutes": 25.0,
            "upright_percentage": 82.5,
            "average_tilt": 4.5,
            "correction_count": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["upright_percentage"], 82.5);
    assert!(stopped["end_time"].is_string());

    let (status, _) = send(&router, Method::POST, &stop_uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&router, Method::GET, &summary_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_count"], 1);
    assert_eq!(json["total_corrections"], 3);
    assert_eq!(json["trend"], "insufficient_data");

    let history_uri = format!("/api/analytics/sessions/{patient_id}?limit=5");
    let (status, json) = send(&router, Method::GET, &history_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn stop_without_samples_or_body_is_bad_request() {
    let router = make_router();
    let patient_id = create_patient(&router).await;
    let (_, session) = send(
        &router,
        Method::POST,
        "/api/monitoring/start",
        Some(json!({ "patient_id": patient_id })),
    )
    .await;

    let stop_uri = format!("/api/monitoring/stop/{}", session["id"].as_str().unwrap());
    let (status, _) = send(&router, Method::POST, &stop_uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn readings_limit_is_applied() {
    let router = make_router();
    let patient_id = create_patient(&router).await;
    for pitch in [1.0, 2.0, 3.0] {
        send(
            &router,
            Method::POST,
            "/api/device/sensor-data",
            Some(reading(&patient_id, pitch)),
        )
        .await;
    }

    let uri = format!("/api/device/readings/{patient_id}?limit=2");
    let (status, json) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn patient_update_and_list() {
    let router = make_router();
    let patient_id = create_patient(&router).await;

    let uri = format!("/api/patients/{patient_id}");
    let (status, json) = send(
        &router,
        Method::PUT,
        &uri,
        Some(json!({ "severity_level": 5, "notifications_enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["severity_level"], 5);
    assert_eq!(json["full_name"], "Ada Patient");

    let (status, json) = send(
        &router,
        Method::PUT,
        &uri,
        Some(json!({
            "stroke_side": "right",
            "severity_level": 2,
            "mobility_level": "walker",
            "stroke_timeline": 7,
            "therapy_status": "outpatient"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stroke_timeline"], 7);
    assert_eq!(json["therapy_status"], "outpatient");
    assert_eq!(json["mobility_level"], "walker");

    let (status, json) = send(&router, Method::PUT, &uri, Some(json!({ "age": 140 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = send(&router, Method::GET, "/api/patients", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(1));
}
