use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{
    AvailabilityRequest, CancelRequest, ConflictQuery, InterviewId, RescheduleRequest,
    ScheduleRequest, SummaryRequest,
};
use super::error::{SchedulingError, ValidationError};
use super::service::{InterviewScheduler, ScheduleOutcome};

/// Router exposing the scheduling operations over JSON.
pub fn scheduler_router(service: Arc<InterviewScheduler>) -> Router {
    Router::new()
        .route("/api/v1/interviews", post(schedule_handler))
        .route("/api/v1/interviews/:interview_id", get(interview_handler))
        .route(
            "/api/v1/interviews/:interview_id/reschedule",
            post(reschedule_handler),
        )
        .route("/api/v1/interviews/:interview_id/cancel", post(cancel_handler))
        .route(
            "/api/v1/interviews/:interview_id/complete",
            post(complete_handler),
        )
        .route("/api/v1/availability", post(availability_handler))
        .route("/api/v1/availability/summary", post(summary_handler))
        .route("/api/v1/conflicts", post(conflicts_handler))
        .route("/api/v1/scheduling/log", get(log_handler))
        .route("/api/v1/scheduling/analytics", get(analytics_handler))
        .with_state(service)
}

pub(crate) async fn schedule_handler(
    State(service): State<Arc<InterviewScheduler>>,
    axum::Json(request): axum::Json<ScheduleRequest>,
) -> Response {
    match service.schedule(request).await {
        Ok(outcome @ ScheduleOutcome::Confirmed { .. }) => {
            (StatusCode::CREATED, axum::Json(outcome)).into_response()
        }
        Ok(outcome @ ScheduleOutcome::NoAvailability { .. }) => {
            (StatusCode::OK, axum::Json(outcome)).into_response()
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn interview_handler(
    State(service): State<Arc<InterviewScheduler>>,
    Path(interview_id): Path<String>,
) -> Response {
    match service.get(&InterviewId(interview_id)).await {
        Ok(interview) => (StatusCode::OK, axum::Json(interview)).into_response(),
        Err(err) => failure(err),
    }
}

pub(crate) async fn reschedule_handler(
    State(service): State<Arc<InterviewScheduler>>,
    Path(interview_id): Path<String>,
    axum::Json(request): axum::Json<RescheduleRequest>,
) -> Response {
    match service
        .reschedule(&InterviewId(interview_id), request)
        .await
    {
        Ok(interview) => (StatusCode::OK, axum::Json(interview)).into_response(),
        Err(err) => failure(err),
    }
}

pub(crate) async fn cancel_handler(
    State(service): State<Arc<InterviewScheduler>>,
    Path(interview_id): Path<String>,
    axum::Json(request): axum::Json<CancelRequest>,
) -> Response {
    match service.cancel(&InterviewId(interview_id), request).await {
        Ok(interview) => (StatusCode::OK, axum::Json(interview)).into_response(),
        Err(err) => failure(err),
    }
}

pub(crate) async fn complete_handler(
    State(service): State<Arc<InterviewScheduler>>,
    Path(interview_id): Path<String>,
) -> Response {
    match service.complete(&InterviewId(interview_id)).await {
        Ok(interview) => (StatusCode::OK, axum::Json(interview)).into_response(),
        Err(err) => failure(err),
    }
}

pub(crate) async fn availability_handler(
    State(service): State<Arc<InterviewScheduler>>,
    axum::Json(request): axum::Json<AvailabilityRequest>,
) -> Response {
    match service.find_availability(request).await {
        Ok(slots) => {
            let payload = json!({ "count": slots.len(), "slots": slots });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn summary_handler(
    State(service): State<Arc<InterviewScheduler>>,
    axum::Json(request): axum::Json<SummaryRequest>,
) -> Response {
    match service.availability_summary(request).await {
        Ok(participants) => {
            let payload = json!({ "participants": participants });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn conflicts_handler(
    State(service): State<Arc<InterviewScheduler>>,
    axum::Json(query): axum::Json<ConflictQuery>,
) -> Response {
    match service.detect_conflicts(query).await {
        Ok(conflicts) => {
            let payload = json!({
                "has_conflicts": !conflicts.is_empty(),
                "conflicts": conflicts,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn log_handler(State(service): State<Arc<InterviewScheduler>>) -> Response {
    match service.log_entries() {
        Ok(entries) => (StatusCode::OK, axum::Json(json!({ "entries": entries }))).into_response(),
        Err(err) => failure(err),
    }
}

pub(crate) async fn analytics_handler(State(service): State<Arc<InterviewScheduler>>) -> Response {
    match service.analytics(None) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => failure(err),
    }
}

fn failure(err: SchedulingError) -> Response {
    let retryable = err.is_retryable();
    let (status, payload) = match &err {
        SchedulingError::Validation(
            ValidationError::ParticipantNotFound(_) | ValidationError::JobNotFound(_),
        )
        | SchedulingError::InterviewNotFound(_) => (
            StatusCode::NOT_FOUND,
            json!({ "error": err.to_string(), "retryable": retryable }),
        ),
        SchedulingError::Validation(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": err.to_string(), "retryable": retryable }),
        ),
        SchedulingError::Conflict { conflicts } => (
            StatusCode::CONFLICT,
            json!({
                "error": err.to_string(),
                "retryable": retryable,
                "conflicts": conflicts,
            }),
        ),
        SchedulingError::TerminalState { status, .. } => (
            StatusCode::CONFLICT,
            json!({
                "error": err.to_string(),
                "retryable": retryable,
                "status": status.label(),
            }),
        ),
        SchedulingError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            json!({ "error": err.to_string(), "retryable": retryable }),
        ),
        SchedulingError::Upstream(upstream) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({
                "error": err.to_string(),
                "retryable": retryable,
                "upstream": upstream,
            }),
        ),
        SchedulingError::AuditLog(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": err.to_string(), "retryable": retryable }),
        ),
    };
    (status, axum::Json(payload)).into_response()
}
