use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::scheduling::domain::InterviewStatus;
use crate::scheduling::router::{cancel_handler, schedule_handler, scheduler_router};
use crate::scheduling::service::SchedulerPorts;
use crate::scheduling::settings::SchedulerSettings;

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn schedule_payload(start: &str, end: &str) -> Value {
    json!({
        "candidate_id": CANDIDATE,
        "job_id": JOB,
        "interviewer_id": LEE,
        "window": { "start": "2025-03-04T09:00:00Z", "end": "2025-03-04T17:00:00Z" },
        "duration_minutes": 60,
        "interval": { "start": start, "end": end },
        "interview_type": "technical",
        "location": "Room 4"
    })
}

#[tokio::test]
async fn schedule_route_creates_interview() {
    let harness = harness();
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/interviews",
            &schedule_payload("2025-03-04T10:00:00Z", "2025-03-04T11:00:00Z"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], "confirmed");
    assert_eq!(body["interview"]["status"], "confirmed");
    assert_eq!(body["interview"]["interval"]["start"], "2025-03-04T10:00:00Z");
    assert_eq!(body["chosen"]["breakdown"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn schedule_route_reports_conflicts() {
    let harness = harness();
    harness.store.seed(booking(
        "int-existing",
        OTHER_CANDIDATE,
        span((10, 0), (11, 0)),
        InterviewStatus::Confirmed,
    ));
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/interviews",
            &schedule_payload("2025-03-04T10:30:00Z", "2025-03-04T11:30:00Z"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["retryable"], true);
    assert_eq!(body["conflicts"][0]["interview"]["id"], "int-existing");
}

#[tokio::test]
async fn inverted_interval_is_rejected_at_the_boundary() {
    let harness = harness();
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/interviews",
            &schedule_payload("2025-03-04T11:00:00Z", "2025-03-04T10:00:00Z"),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(harness.store.len(), 0);
}

#[tokio::test]
async fn schedule_handler_maps_upstream_timeout_to_unavailable() {
    let harness = harness_with(SchedulerSettings::default(), |ports| SchedulerPorts {
        calendar: Arc::new(SlowCalendar),
        ..ports
    });
    let mut request = schedule_request(span((9, 0), (17, 0)), 60);
    request.timeout_ms = Some(20);

    let response = schedule_handler(State(harness.scheduler.clone()), axum::Json(request)).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(body["retryable"], true);
    assert_eq!(body["upstream"]["Timeout"]["service"], "calendar");
}

#[tokio::test]
async fn schedule_handler_returns_ok_when_nothing_fits() {
    let harness = harness();
    harness.calendar.block(LEE, span((0, 0), (23, 0)));

    let response = schedule_handler(
        State(harness.scheduler.clone()),
        axum::Json(schedule_request(span((9, 0), (17, 0)), 60)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], "no_availability");
}

#[tokio::test]
async fn cancel_handler_rejects_completed_interviews() {
    let harness = harness();
    harness.store.seed(booking(
        "int-held",
        CANDIDATE,
        span((10, 0), (11, 0)),
        InterviewStatus::Completed,
    ));

    let response = cancel_handler(
        State(harness.scheduler.clone()),
        Path("int-held".to_string()),
        axum::Json(crate::scheduling::domain::CancelRequest {
            reason: "duplicate".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn missing_interview_is_not_found() {
    let harness = harness();
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .oneshot(
            Request::get("/api/v1/interviews/int-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn availability_without_participants_is_unprocessable() {
    let harness = harness();
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/availability",
            &json!({
                "participant_ids": [],
                "range": { "start": "2025-03-04T09:00:00Z", "end": "2025-03-04T17:00:00Z" },
                "duration_minutes": 60
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn conflicts_route_reports_overlaps() {
    let harness = harness();
    harness.store.seed(booking(
        "int-existing",
        CANDIDATE,
        span((10, 0), (11, 0)),
        InterviewStatus::Confirmed,
    ));
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/conflicts",
            &json!({
                "interval": { "start": "2025-03-04T10:45:00Z", "end": "2025-03-04T11:15:00Z" },
                "participant_ids": [LEE]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["has_conflicts"], true);
    assert_eq!(body["conflicts"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn log_and_analytics_routes_expose_decisions() {
    let harness = harness();
    harness
        .scheduler
        .schedule(schedule_request(span((9, 0), (17, 0)), 60))
        .await
        .expect("scheduled");
    let router = scheduler_router(harness.scheduler.clone());

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/scheduling/log")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["entries"][0]["outcome"], "committed");
    assert_eq!(body["entries"][0]["sequence"], 1);

    let response = router
        .oneshot(
            Request::get("/api/v1/scheduling/analytics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["schedules_committed"], 1);
}
