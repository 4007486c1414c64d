//! Interview scheduling engine: interval arithmetic, availability resolution, conflict
//! detection, slot scoring and the orchestrator that owns the interview lifecycle.

pub mod audit;
pub mod availability;
pub mod conflicts;
pub mod domain;
pub mod error;
pub mod import;
pub mod interval;
pub(crate) mod locks;
pub mod policy;
pub mod ports;
pub mod router;
pub mod scoring;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;

pub use audit::{
    DecisionOutcome, MemorySchedulingLog, SchedulingAction, SchedulingAnalytics, SchedulingLog,
    SchedulingLogEntry,
};
pub use availability::{find_slots, AvailabilitySummary, Buffer, ParticipantSnapshot, SlotSearch};
pub use conflicts::{detect_conflicts, Bookings, ConflictRecord};
pub use domain::{
    AvailabilityRequest, CancelRequest, ConflictQuery, Interview, InterviewId, InterviewStatus,
    InterviewType, Job, JobId, Participant, ParticipantId, ParticipantRole, RescheduleRequest,
    ScheduleRequest, SchedulingPriority, SummaryRequest,
};
pub use error::{SchedulingError, UpstreamError, ValidationError};
pub use import::{CalendarCsvImporter, CalendarImport, CalendarImportError};
pub use interval::{BusySet, Interval, IntervalError};
pub use policy::{DayPart, PreferredWindow, WorkingHours};
pub use ports::{
    CalendarError, CalendarStore, Directory, DirectoryError, InterviewStore, NotificationEvent,
    Notifier, NotifyError, RepositoryError,
};
pub use router::scheduler_router;
pub use scoring::{ScoreFactor, ScoringWeights, SlotCandidate, SlotScorer, WeightsError};
pub use service::{InterviewScheduler, ScheduleOutcome, SchedulerPorts};
pub use settings::SchedulerSettings;
