//! Collaborator contracts consumed by the orchestrator.
//!
//! Adapters live outside the core (see the API service for in-memory versions). Every
//! call is async and bounded by the orchestrator's timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Interview, InterviewId, Job, JobId, Participant, ParticipantId};
use super::interval::{BusySet, Interval};

/// Read-only lookup of participants and jobs.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn participant(&self, id: &ParticipantId) -> Result<Participant, DirectoryError>;
    async fn job(&self, id: &JobId) -> Result<Job, DirectoryError>;
    /// Every interviewer, used as the cohort for workload normalisation.
    async fn interviewers(&self) -> Result<Vec<Participant>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory entry not found")]
    NotFound,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of busy time and sink for confirmed bookings.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn busy_intervals(
        &self,
        participant: &ParticipantId,
        window: &Interval,
    ) -> Result<BusySet, CalendarError>;
    async fn commit_interview(&self, interview: &Interview) -> Result<(), CalendarError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar rejected the booking as conflicting")]
    Conflict,
    #[error("calendar unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Scheduled,
    Rescheduled,
    Cancelled,
}

impl NotificationEvent {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationEvent::Scheduled => "scheduled",
            NotificationEvent::Rescheduled => "rescheduled",
            NotificationEvent::Cancelled => "cancelled",
        }
    }
}

/// Best-effort participant messaging. Retries are the notifier's own business.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        event: NotificationEvent,
        interview: &Interview,
        participants: &[Participant],
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Durable interview records. Stores what it is given; never changes business state.
#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn save(&self, interview: &Interview) -> Result<(), RepositoryError>;
    async fn find(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError>;
    async fn list_active(&self, participant: &ParticipantId)
        -> Result<Vec<Interview>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
