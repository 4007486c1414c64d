use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::scheduling::audit::{AuditError, LogEntryDraft, MemorySchedulingLog, SchedulingLog, SchedulingLogEntry};
use crate::scheduling::domain::{
    Interview, InterviewId, InterviewStatus, InterviewType, Job, JobId, Participant,
    ParticipantId, ParticipantRole, ScheduleRequest, SchedulingPriority,
};
use crate::scheduling::interval::{BusySet, Interval};
use crate::scheduling::policy::WorkingHours;
use crate::scheduling::ports::{
    CalendarError, CalendarStore, Directory, DirectoryError, InterviewStore, NotificationEvent,
    Notifier, NotifyError, RepositoryError,
};
use crate::scheduling::service::{InterviewScheduler, SchedulerPorts};
use crate::scheduling::settings::SchedulerSettings;

pub(super) const LEE: &str = "lee@example.com";
pub(super) const KIM: &str = "kim@example.com";
pub(super) const CANDIDATE: &str = "cand-1";
pub(super) const OTHER_CANDIDATE: &str = "cand-2";
pub(super) const JOB: &str = "job-1";

/// Monday 2025-03-03 08:00 UTC; fixtures book on the following Tuesday.
pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 4, hour, minute, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn span(start: (u32, u32), end: (u32, u32)) -> Interval {
    Interval::new(at(start.0, start.1), at(end.0, end.1)).expect("valid interval")
}

pub(super) fn pid(value: &str) -> ParticipantId {
    ParticipantId(value.to_string())
}

pub(super) fn participant(id: &str, role: ParticipantRole, workload: u32) -> Participant {
    Participant {
        id: pid(id),
        name: id.to_string(),
        role,
        timezone: chrono_tz::UTC,
        working_hours: WorkingHours::business_days(),
        current_workload: workload,
        preferred_day_part: None,
    }
}

pub(super) fn schedule_request(window: Interval, minutes: u32) -> ScheduleRequest {
    ScheduleRequest {
        candidate_id: pid(CANDIDATE),
        job_id: JobId(JOB.to_string()),
        interviewer_id: pid(LEE),
        window,
        duration_minutes: minutes,
        interval: None,
        force: false,
        interview_type: InterviewType::Technical,
        location: "Room 4".to_string(),
        notes: None,
        priority: SchedulingPriority::Medium,
        preferred_time: None,
        timeout_ms: None,
    }
}

pub(super) fn explicit_request(interval: Interval) -> ScheduleRequest {
    ScheduleRequest {
        interval: Some(interval),
        ..schedule_request(span((9, 0), (17, 0)), interval.duration().num_minutes() as u32)
    }
}

/// Existing booking between `LEE` and `candidate`.
pub(super) fn booking(id: &str, candidate: &str, interval: Interval, status: InterviewStatus) -> Interview {
    Interview {
        id: InterviewId(id.to_string()),
        candidate_id: pid(candidate),
        job_id: JobId(JOB.to_string()),
        interviewer_id: pid(LEE),
        interval,
        location: "Room 1".to_string(),
        interview_type: InterviewType::PhoneScreen,
        status,
        notes: None,
        created_at: fixed_now(),
        updated_at: fixed_now(),
        reschedule_count: 0,
        history: Vec::new(),
        cancellation_reason: None,
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    participants: HashMap<ParticipantId, Participant>,
    jobs: HashMap<JobId, Job>,
}

impl MemoryDirectory {
    pub(super) fn seeded() -> Self {
        let mut directory = Self::default();
        directory.insert(participant(LEE, ParticipantRole::Interviewer, 1));
        directory.insert(participant(KIM, ParticipantRole::Interviewer, 4));
        directory.insert(participant(CANDIDATE, ParticipantRole::Candidate, 0));
        directory.insert(participant(OTHER_CANDIDATE, ParticipantRole::Candidate, 0));
        directory.jobs.insert(
            JobId(JOB.to_string()),
            Job {
                id: JobId(JOB.to_string()),
                title: "Platform Engineer".to_string(),
                target_fill_date: None,
            },
        );
        directory
    }

    pub(super) fn insert(&mut self, participant: Participant) {
        self.participants.insert(participant.id.clone(), participant);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn participant(&self, id: &ParticipantId) -> Result<Participant, DirectoryError> {
        self.participants
            .get(id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn job(&self, id: &JobId) -> Result<Job, DirectoryError> {
        self.jobs.get(id).cloned().ok_or(DirectoryError::NotFound)
    }

    async fn interviewers(&self) -> Result<Vec<Participant>, DirectoryError> {
        let mut interviewers: Vec<Participant> = self
            .participants
            .values()
            .filter(|participant| participant.role == ParticipantRole::Interviewer)
            .cloned()
            .collect();
        interviewers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(interviewers)
    }
}

#[derive(Default)]
pub(super) struct MemoryCalendar {
    busy: Mutex<HashMap<ParticipantId, BusySet>>,
    pub(super) commits: Mutex<Vec<Interview>>,
}

impl MemoryCalendar {
    pub(super) fn block(&self, participant: &str, interval: Interval) {
        self.busy
            .lock()
            .expect("mutex poisoned")
            .entry(pid(participant))
            .or_default()
            .insert(interval);
    }

    pub(super) fn committed(&self) -> Vec<Interview> {
        self.commits.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl CalendarStore for MemoryCalendar {
    async fn busy_intervals(
        &self,
        participant: &ParticipantId,
        window: &Interval,
    ) -> Result<BusySet, CalendarError> {
        let busy = self.busy.lock().expect("mutex poisoned");
        Ok(busy
            .get(participant)
            .map(|set| set.overlapping(window).copied().collect())
            .unwrap_or_default())
    }

    async fn commit_interview(&self, interview: &Interview) -> Result<(), CalendarError> {
        self.commits
            .lock()
            .expect("mutex poisoned")
            .push(interview.clone());
        Ok(())
    }
}

/// Calendar that never answers within a short timeout.
pub(super) struct SlowCalendar;

#[async_trait]
impl CalendarStore for SlowCalendar {
    async fn busy_intervals(
        &self,
        _participant: &ParticipantId,
        _window: &Interval,
    ) -> Result<BusySet, CalendarError> {
        tokio::time::sleep(StdDuration::from_millis(500)).await;
        Ok(BusySet::new())
    }

    async fn commit_interview(&self, _interview: &Interview) -> Result<(), CalendarError> {
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    events: Mutex<Vec<(NotificationEvent, InterviewId, usize)>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<(NotificationEvent, InterviewId, usize)> {
        self.events.lock().expect("mutex poisoned").clone()
    }

    pub(super) fn count(&self, event: NotificationEvent) -> usize {
        self.events()
            .iter()
            .filter(|(recorded, _, _)| *recorded == event)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        event: NotificationEvent,
        interview: &Interview,
        participants: &[Participant],
    ) -> Result<(), NotifyError> {
        self.events.lock().expect("mutex poisoned").push((
            event,
            interview.id.clone(),
            participants.len(),
        ));
        Ok(())
    }
}

pub(super) struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _event: NotificationEvent,
        _interview: &Interview,
        _participants: &[Participant],
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay down".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    interviews: Mutex<HashMap<InterviewId, Interview>>,
}

impl MemoryStore {
    pub(super) fn seed(&self, interview: Interview) {
        self.interviews
            .lock()
            .expect("mutex poisoned")
            .insert(interview.id.clone(), interview);
    }

    pub(super) fn len(&self) -> usize {
        self.interviews.lock().expect("mutex poisoned").len()
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn save(&self, interview: &Interview) -> Result<(), RepositoryError> {
        self.seed(interview.clone());
        Ok(())
    }

    async fn find(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(self.interviews.lock().expect("mutex poisoned").get(id).cloned())
    }

    async fn list_active(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<Interview>, RepositoryError> {
        Ok(self
            .interviews
            .lock()
            .expect("mutex poisoned")
            .values()
            .filter(|interview| interview.is_active() && interview.involves(participant))
            .cloned()
            .collect())
    }
}

/// Store whose writes always fail; reads see an empty database.
pub(super) struct UnavailableStore;

#[async_trait]
impl InterviewStore for UnavailableStore {
    async fn save(&self, _interview: &Interview) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("primary is read-only".to_string()))
    }

    async fn find(&self, _id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(None)
    }

    async fn list_active(
        &self,
        _participant: &ParticipantId,
    ) -> Result<Vec<Interview>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableLog;

impl SchedulingLog for UnavailableLog {
    fn append(&self, _draft: LogEntryDraft) -> Result<SchedulingLogEntry, AuditError> {
        Err(AuditError::Unavailable("disk full".to_string()))
    }

    fn entries(&self) -> Result<Vec<SchedulingLogEntry>, AuditError> {
        Ok(Vec::new())
    }
}

pub(super) struct Harness {
    pub(super) scheduler: Arc<InterviewScheduler>,
    pub(super) calendar: Arc<MemoryCalendar>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) log: Arc<MemorySchedulingLog>,
}

impl Harness {
    pub(super) fn entries(&self) -> Vec<SchedulingLogEntry> {
        self.log.entries().expect("log readable")
    }
}

pub(super) fn harness() -> Harness {
    harness_with(SchedulerSettings::default(), |ports| ports)
}

/// Build a scheduler over in-memory collaborators; `customize` may swap any of them.
pub(super) fn harness_with(
    settings: SchedulerSettings,
    customize: impl FnOnce(SchedulerPorts) -> SchedulerPorts,
) -> Harness {
    let calendar = Arc::new(MemoryCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::default());
    let log = Arc::new(MemorySchedulingLog::new());

    let ports = customize(SchedulerPorts {
        directory: Arc::new(MemoryDirectory::seeded()),
        calendar: calendar.clone(),
        notifier: notifier.clone(),
        store: store.clone(),
        log: log.clone(),
    });

    let scheduler = Arc::new(InterviewScheduler::new(ports, settings).with_clock(fixed_now));

    Harness {
        scheduler,
        calendar,
        notifier,
        store,
        log,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
