use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use interview_scheduler::error::AppError;
use interview_scheduler::scheduling::{
    BusySet, CalendarCsvImporter, CalendarError, CalendarImport, CalendarStore, DayPart,
    Directory, DirectoryError, InterviewId, InterviewScheduler, InterviewStore, Interval,
    Interview, Job, JobId, MemorySchedulingLog, NotificationEvent, Notifier, NotifyError,
    Participant, ParticipantId, ParticipantRole, RepositoryError, SchedulerPorts,
    SchedulerSettings, WorkingHours,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryDirectory {
    participants: HashMap<ParticipantId, Participant>,
    jobs: HashMap<JobId, Job>,
}

impl InMemoryDirectory {
    pub(crate) fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.insert(participant.id.clone(), participant);
        self
    }

    pub(crate) fn with_job(mut self, job: Job) -> Self {
        self.jobs.insert(job.id.clone(), job);
        self
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
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
        Ok(self
            .participants
            .values()
            .filter(|participant| participant.role == ParticipantRole::Interviewer)
            .cloned()
            .collect())
    }
}

/// Imported busy time plus every active interview the scheduler has committed.
#[derive(Default)]
pub(crate) struct InMemoryCalendar {
    imported: Mutex<HashMap<ParticipantId, BusySet>>,
    booked: Mutex<HashMap<InterviewId, Interview>>,
}

impl InMemoryCalendar {
    pub(crate) fn load(&self, import: CalendarImport) -> usize {
        let mut imported = self.imported.lock().unwrap_or_else(PoisonError::into_inner);
        for (participant, busy) in import.busy {
            let merged = imported
                .get(&participant)
                .map(|existing| existing.union(&busy))
                .unwrap_or(busy);
            imported.insert(participant, merged);
        }
        import.rows
    }
}

#[async_trait]
impl CalendarStore for InMemoryCalendar {
    async fn busy_intervals(
        &self,
        participant: &ParticipantId,
        window: &Interval,
    ) -> Result<BusySet, CalendarError> {
        let imported = self
            .imported
            .lock()
            .map_err(|_| CalendarError::Unavailable("calendar mutex poisoned".to_string()))?;
        let booked = self
            .booked
            .lock()
            .map_err(|_| CalendarError::Unavailable("calendar mutex poisoned".to_string()))?;

        let mut busy: Vec<Interval> = imported
            .get(participant)
            .map(|set| set.overlapping(window).copied().collect())
            .unwrap_or_default();
        busy.extend(
            booked
                .values()
                .filter(|interview| interview.involves(participant))
                .map(|interview| interview.interval)
                .filter(|interval| interval.overlaps(window)),
        );
        Ok(BusySet::from_intervals(busy))
    }

    async fn commit_interview(&self, interview: &Interview) -> Result<(), CalendarError> {
        let mut booked = self
            .booked
            .lock()
            .map_err(|_| CalendarError::Unavailable("calendar mutex poisoned".to_string()))?;
        if interview.is_active() {
            booked.insert(interview.id.clone(), interview.clone());
        } else {
            booked.remove(&interview.id);
        }
        Ok(())
    }
}

/// Stands in for e-mail delivery by emitting one event per recipient.
#[derive(Default)]
pub(crate) struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        event: NotificationEvent,
        interview: &Interview,
        participants: &[Participant],
    ) -> Result<(), NotifyError> {
        for participant in participants {
            let local_start = interview
                .interval
                .start()
                .with_timezone(&participant.timezone);
            info!(
                event = event.label(),
                interview_id = %interview.id,
                recipient = %participant.id,
                local_start = %local_start,
                "{}",
                interview.title()
            );
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryInterviewStore {
    records: Mutex<HashMap<InterviewId, Interview>>,
}

impl InMemoryInterviewStore {
    fn records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<InterviewId, Interview>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

#[async_trait]
impl InterviewStore for InMemoryInterviewStore {
    async fn save(&self, interview: &Interview) -> Result<(), RepositoryError> {
        self.records()?
            .insert(interview.id.clone(), interview.clone());
        Ok(())
    }

    async fn find(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(self.records()?.get(id).cloned())
    }

    async fn list_active(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<Interview>, RepositoryError> {
        Ok(self
            .records()?
            .values()
            .filter(|interview| interview.is_active() && interview.involves(participant))
            .cloned()
            .collect())
    }
}

fn person(
    id: &str,
    name: &str,
    role: ParticipantRole,
    timezone: chrono_tz::Tz,
    workload: u32,
    preferred_day_part: Option<DayPart>,
) -> Participant {
    Participant {
        id: ParticipantId(id.to_string()),
        name: name.to_string(),
        role,
        timezone,
        working_hours: WorkingHours::business_days(),
        current_workload: workload,
        preferred_day_part,
    }
}

/// Demo roster: three interviewers across three regions and two candidates.
pub(crate) fn seeded_directory(now: DateTime<Utc>) -> InMemoryDirectory {
    use ParticipantRole::{Candidate, Interviewer};

    InMemoryDirectory::default()
        .with_participant(person(
            "lee@example.com",
            "Jordan Lee",
            Interviewer,
            chrono_tz::America::New_York,
            3,
            None,
        ))
        .with_participant(person(
            "kim@example.com",
            "Sam Kim",
            Interviewer,
            chrono_tz::Europe::London,
            1,
            None,
        ))
        .with_participant(person(
            "ortiz@example.com",
            "Ana Ortiz",
            Interviewer,
            chrono_tz::America::Los_Angeles,
            5,
            None,
        ))
        .with_participant(person(
            "cand-100",
            "Riley Chen",
            Candidate,
            chrono_tz::America::Chicago,
            0,
            Some(DayPart::Morning),
        ))
        .with_participant(person(
            "cand-101",
            "Morgan Patel",
            Candidate,
            chrono_tz::Europe::Berlin,
            0,
            Some(DayPart::Afternoon),
        ))
        .with_job(Job {
            id: JobId("job-backend".to_string()),
            title: "Backend Engineer".to_string(),
            target_fill_date: None,
        })
        .with_job(Job {
            id: JobId("job-sre".to_string()),
            title: "Site Reliability Engineer".to_string(),
            target_fill_date: Some(now + Duration::days(10)),
        })
}

/// Wire the scheduler over in-memory collaborators, optionally preloading busy time.
pub(crate) fn build_scheduler(
    settings: SchedulerSettings,
    calendar_csv: Option<&Path>,
) -> Result<Arc<InterviewScheduler>, AppError> {
    let calendar = Arc::new(InMemoryCalendar::default());
    if let Some(path) = calendar_csv {
        let import = CalendarCsvImporter::from_path(path)?;
        let participants = import.busy.len();
        let rows = calendar.load(import);
        info!(rows, participants, path = %path.display(), "calendar busy time imported");
    }

    let ports = SchedulerPorts {
        directory: Arc::new(seeded_directory(Utc::now())),
        calendar,
        notifier: Arc::new(TracingNotifier),
        store: Arc::new(InMemoryInterviewStore::default()),
        log: Arc::new(MemorySchedulingLog::new()),
    };
    Ok(Arc::new(InterviewScheduler::new(ports, settings)))
}

/// First Monday-to-Friday date strictly after `from`.
pub(crate) fn next_business_day(from: NaiveDate) -> NaiveDate {
    let mut day = from + Duration::days(1);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day += Duration::days(1);
    }
    day
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
