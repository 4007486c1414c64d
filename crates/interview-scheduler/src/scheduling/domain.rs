use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::interval::Interval;
use super::policy::{DayPart, PreferredWindow, WorkingHours};

/// Stable participant identity; interviewers are keyed by e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

/// Identifier wrapper for scheduled interviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterviewId(pub String);

/// Identifier wrapper for open job positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InterviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Interviewer,
    Candidate,
}

impl ParticipantRole {
    pub const fn label(self) -> &'static str {
        match self {
            ParticipantRole::Interviewer => "interviewer",
            ParticipantRole::Candidate => "candidate",
        }
    }
}

/// Directory view of someone who takes part in an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: ParticipantRole,
    pub timezone: Tz,
    pub working_hours: WorkingHours,
    /// Active interviews in the current reference period.
    #[serde(default)]
    pub current_workload: u32,
    #[serde(default)]
    pub preferred_day_part: Option<DayPart>,
}

/// Job metadata the scorer needs for urgency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub target_fill_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    PhoneScreen,
    #[default]
    Technical,
    Behavioral,
    Panel,
    Final,
    CulturalFit,
}

impl InterviewType {
    pub const fn label(self) -> &'static str {
        match self {
            InterviewType::PhoneScreen => "Phone Screen",
            InterviewType::Technical => "Technical",
            InterviewType::Behavioral => "Behavioral",
            InterviewType::Panel => "Panel",
            InterviewType::Final => "Final",
            InterviewType::CulturalFit => "Cultural Fit",
        }
    }
}

/// Requester-declared priority; supplies urgency when the job has no fill deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPriority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl SchedulingPriority {
    pub const fn pressure(self) -> f64 {
        match self {
            SchedulingPriority::Urgent => 1.0,
            SchedulingPriority::High => 0.75,
            SchedulingPriority::Medium => 0.5,
            SchedulingPriority::Low => 0.25,
        }
    }
}

/// Interview lifecycle.
///
/// `requested -> confirmed -> completed`, `confirmed -> rescheduled -> confirmed`, and
/// `requested | confirmed -> cancelled`. `Rescheduled` only exists inside a single
/// reschedule operation and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Requested,
    Confirmed,
    Rescheduled,
    Completed,
    Cancelled,
}

impl InterviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InterviewStatus::Requested => "requested",
            InterviewStatus::Confirmed => "confirmed",
            InterviewStatus::Rescheduled => "rescheduled",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
        }
    }

    /// Active interviews block their interval for every participant.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            InterviewStatus::Requested | InterviewStatus::Confirmed | InterviewStatus::Rescheduled
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, InterviewStatus::Completed | InterviewStatus::Cancelled)
    }

    pub const fn can_transition_to(self, next: InterviewStatus) -> bool {
        use InterviewStatus::*;
        matches!(
            (self, next),
            (Requested, Confirmed)
                | (Confirmed, Completed)
                | (Confirmed, Rescheduled)
                | (Rescheduled, Confirmed)
                | (Requested, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected lifecycle edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: InterviewStatus,
    pub to: InterviewStatus,
}

/// One entry of an interview's reschedule history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChange {
    pub from: Interval,
    pub to: Interval,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Interview record owned by the orchestrator. Persistence stores it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub candidate_id: ParticipantId,
    pub job_id: JobId,
    /// Interviewer identity (e-mail address).
    pub interviewer_id: ParticipantId,
    pub interval: Interval,
    pub location: String,
    pub interview_type: InterviewType,
    pub status: InterviewStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reschedule_count: u32,
    #[serde(default)]
    pub history: Vec<ScheduleChange>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

impl Interview {
    pub fn participant_ids(&self) -> [&ParticipantId; 2] {
        [&self.candidate_id, &self.interviewer_id]
    }

    pub fn involves(&self, participant: &ParticipantId) -> bool {
        &self.candidate_id == participant || &self.interviewer_id == participant
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn transition(
        &mut self,
        next: InterviewStatus,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    /// Move to a new interval through `rescheduled`, ending back in `confirmed`.
    pub fn reschedule(
        &mut self,
        to: Interval,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(InterviewStatus::Rescheduled, at)?;
        self.history.push(ScheduleChange {
            from: self.interval,
            to,
            reason: reason.to_string(),
            at,
        });
        self.interval = to;
        self.reschedule_count += 1;
        self.transition(InterviewStatus::Confirmed, at)
    }

    pub fn title(&self) -> String {
        format!("{} interview", self.interview_type.label())
    }
}

/// Inbound request for `schedule`. Without an explicit `interval` the engine searches `window`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub candidate_id: ParticipantId,
    pub job_id: JobId,
    pub interviewer_id: ParticipantId,
    pub window: Interval,
    pub duration_minutes: u32,
    #[serde(default)]
    pub interval: Option<Interval>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub interview_type: InterviewType,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: SchedulingPriority,
    /// Preferred start time-of-day in the interviewer's timezone.
    #[serde(default)]
    pub preferred_time: Option<PreferredWindow>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ScheduleRequest {
    pub fn summary(&self) -> String {
        format!(
            "candidate={} job={} interviewer={} window={}..{} duration={}m{}",
            self.candidate_id,
            self.job_id,
            self.interviewer_id,
            self.window.start().to_rfc3339(),
            self.window.end().to_rfc3339(),
            self.duration_minutes,
            if self.force { " force" } else { "" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub new_interval: Interval,
    pub reason: String,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// Read-only availability search across a participant set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub participant_ids: Vec<ParticipantId>,
    pub range: Interval,
    pub duration_minutes: u32,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub priority: SchedulingPriority,
    #[serde(default)]
    pub preferred_time: Option<PreferredWindow>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictQuery {
    pub interval: Interval,
    pub participant_ids: Vec<ParticipantId>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Participants whose calendars should be summarised over `range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub participant_ids: Vec<ParticipantId>,
    pub range: Interval,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}
