use serde::Serialize;

use super::conflicts::ConflictRecord;
use super::domain::{
    InterviewId, InterviewStatus, InvalidTransition, ParticipantId, ParticipantRole,
};
use super::interval::IntervalError;

/// Terminal input problems. Never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    MalformedInterval(#[from] IntervalError),
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("participant {id} is not registered as {}", .expected.label())]
    UnexpectedRole {
        id: ParticipantId,
        expected: ParticipantRole,
    },
    #[error("duration must be between 15 and 480 minutes (got {0})")]
    InvalidDuration(i64),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("at least one participant is required")]
    NoParticipants,
    #[error("interval falls outside working hours for {0}")]
    OutsideWorkingHours(ParticipantId),
    #[error("{participant} already has {limit} interviews on that day")]
    DailyLimitReached {
        participant: ParticipantId,
        limit: u32,
    },
    #[error("interview {id} has been rescheduled {count} times (limit {limit})")]
    RescheduleLimitReached {
        id: InterviewId,
        count: u32,
        limit: u32,
    },
}

/// A collaborator timed out or failed. Retryable by the caller with backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} did not answer within {after_ms}ms")]
    Timeout { service: &'static str, after_ms: u64 },
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

/// Error raised by the scheduling orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("interval conflicts with {} existing commitment(s)", .conflicts.len())]
    Conflict { conflicts: Vec<ConflictRecord> },
    #[error("interview {id} is {status} and can no longer change")]
    TerminalState {
        id: InterviewId,
        status: InterviewStatus,
    },
    #[error("interview {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: InterviewId,
        from: InterviewStatus,
        to: InterviewStatus,
    },
    #[error("interview {0} not found")]
    InterviewNotFound(InterviewId),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("scheduling log append failed: {0}")]
    AuditLog(String),
}

impl SchedulingError {
    /// Conflicts are retried with another slot; upstream failures with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulingError::Conflict { .. } | SchedulingError::Upstream(_)
        )
    }

    pub(crate) fn transition(id: &InterviewId, err: InvalidTransition) -> Self {
        if err.from.is_terminal() {
            SchedulingError::TerminalState {
                id: id.clone(),
                status: err.from,
            }
        } else {
            SchedulingError::InvalidTransition {
                id: id.clone(),
                from: err.from,
                to: err.to,
            }
        }
    }
}

impl From<IntervalError> for SchedulingError {
    fn from(value: IntervalError) -> Self {
        SchedulingError::Validation(ValidationError::MalformedInterval(value))
    }
}
