use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::audit::{
    analytics, DecisionOutcome, LogEntryDraft, SchedulingAction, SchedulingAnalytics,
    SchedulingLog, SchedulingLogEntry,
};
use super::availability::{
    find_slots, free_intervals, shared_free_intervals, AvailabilitySummary, Buffer,
    ParticipantSnapshot, SlotSearch,
};
use super::conflicts::{detect_conflicts, Bookings, ConflictRecord};
use super::domain::{
    AvailabilityRequest, CancelRequest, ConflictQuery, Interview, InterviewId, InterviewStatus,
    Job, JobId, Participant, ParticipantId, ParticipantRole, RescheduleRequest, ScheduleRequest,
    SchedulingPriority, SummaryRequest,
};
use super::error::{SchedulingError, UpstreamError, ValidationError};
use super::interval::{BusySet, Interval};
use super::locks::ParticipantLocks;
use super::policy::PreferredWindow;
use super::ports::{
    CalendarStore, Directory, DirectoryError, InterviewStore, NotificationEvent, Notifier,
    RepositoryError,
};
use super::scoring::{rank, SchedulingContext, SlotCandidate, SlotScorer};
use super::settings::{
    SchedulerSettings, DEFAULT_MAX_RESULTS, MAX_DURATION_MINUTES, MAX_RESULTS_CAP,
    MIN_DURATION_MINUTES, MAX_SEARCH_DAYS,
};

const DIRECTORY: &str = "directory";
const CALENDAR: &str = "calendar";
const PERSISTENCE: &str = "persistence";
const NOTIFIER: &str = "notifier";

/// Busy time read on each side of an explicit interval, for availability-quality scoring.
const CONTEXT_PADDING_HOURS: i64 = 12;

/// Collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct SchedulerPorts {
    pub directory: Arc<dyn Directory>,
    pub calendar: Arc<dyn CalendarStore>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn InterviewStore>,
    pub log: Arc<dyn SchedulingLog>,
}

/// Result of a schedule request. An empty search is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Confirmed {
        interview: Interview,
        chosen: SlotCandidate,
        alternatives: Vec<SlotCandidate>,
    },
    NoAvailability {
        slots_evaluated: usize,
    },
}

impl ScheduleOutcome {
    pub fn interview(&self) -> Option<&Interview> {
        match self {
            ScheduleOutcome::Confirmed { interview, .. } => Some(interview),
            ScheduleOutcome::NoAvailability { .. } => None,
        }
    }
}

/// Public entry point: owns the interview lifecycle and the check-then-commit discipline.
pub struct InterviewScheduler {
    ports: SchedulerPorts,
    settings: SchedulerSettings,
    scorer: SlotScorer,
    locks: ParticipantLocks,
    clock: fn() -> DateTime<Utc>,
}

static INTERVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_interview_id() -> InterviewId {
    let id = INTERVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InterviewId(format!("int-{id:06}"))
}

/// Everything read before the participant locks are taken.
struct Prepared {
    interviewer: Participant,
    candidate: Participant,
    job: Option<Job>,
    snapshots: Vec<ParticipantSnapshot>,
    cohort: Vec<u32>,
}

/// A decision reached inside the critical section, waiting for its log entry.
struct Decision {
    interview: Interview,
    chosen: SlotCandidate,
    alternatives: Vec<SlotCandidate>,
}

impl InterviewScheduler {
    pub fn new(ports: SchedulerPorts, settings: SchedulerSettings) -> Self {
        let scorer = SlotScorer::new(settings.weights);
        Self {
            ports,
            settings,
            scorer,
            locks: ParticipantLocks::new(),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, for deterministic scoring and timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Book an interview, either at an explicit interval or at the best slot in the window.
    pub async fn schedule(
        &self,
        request: ScheduleRequest,
    ) -> Result<ScheduleOutcome, SchedulingError> {
        let started = Instant::now();
        let limit = self.settings.timeout_for(request.timeout_ms);

        let duration = validate_duration(i64::from(request.duration_minutes))?;
        validate_range(&request.window)?;
        if let Some(interval) = &request.interval {
            validate_duration(interval.duration().num_minutes())?;
        }

        let candidate = self
            .participant(&request.candidate_id, Some(ParticipantRole::Candidate), limit)
            .await?;
        let interviewer = self
            .participant(&request.interviewer_id, Some(ParticipantRole::Interviewer), limit)
            .await?;
        let job = self.job(&request.job_id, limit).await?;

        let read_window = match &request.interval {
            Some(interval) => context_window(interval),
            None => request.window,
        };
        let prepared = self
            .prepare(interviewer, candidate, Some(job), &read_window, limit)
            .await?;

        let decision = {
            let _guard = self
                .locks
                .acquire([&prepared.interviewer.id, &prepared.candidate.id])
                .await;

            let bookings = self
                .bookings(&[&prepared.interviewer.id, &prepared.candidate.id], limit)
                .await?;
            let bookings = with_calendar(bookings, &prepared.snapshots);

            let (decided, evaluated) = match request.interval {
                Some(interval) => (
                    Some(self.decide_explicit(&request, &prepared, &bookings, interval, started)?),
                    1,
                ),
                None => self.decide_search(&request, &prepared, &bookings, duration)?,
            };

            let Some(decision) = decided else {
                let mut draft = self.draft(
                    SchedulingAction::Schedule,
                    request.summary(),
                    DecisionOutcome::NoAvailability,
                    "no slot satisfies every constraint in the window",
                    started,
                );
                draft.slots_evaluated = evaluated;
                self.note(draft);
                info!(
                    candidate = %request.candidate_id,
                    interviewer = %request.interviewer_id,
                    slots_evaluated = evaluated,
                    "no availability in requested window"
                );
                return Ok(ScheduleOutcome::NoAvailability {
                    slots_evaluated: evaluated,
                });
            };

            let mut draft = self.draft(
                SchedulingAction::Schedule,
                request.summary(),
                DecisionOutcome::Committed,
                if request.interval.is_some() {
                    "explicit interval accepted"
                } else {
                    "highest ranked slot"
                },
                started,
            );
            draft.interview_id = Some(decision.interview.id.clone());
            draft.chosen_slot = Some(decision.interview.interval);
            draft.slots_evaluated = evaluated;
            draft.best_score = Some(decision.chosen.score);
            self.commit(&decision.interview, draft, limit).await?;
            decision
        };

        info!(
            interview_id = %decision.interview.id,
            start = %decision.interview.interval.start(),
            score = decision.chosen.score,
            "interview scheduled"
        );

        self.sync_calendar(&decision.interview, limit).await;
        self.notify(
            NotificationEvent::Scheduled,
            &decision.interview,
            &[prepared.interviewer, prepared.candidate],
            limit,
        )
        .await;

        Ok(ScheduleOutcome::Confirmed {
            interview: decision.interview,
            chosen: decision.chosen,
            alternatives: decision.alternatives,
        })
    }

    fn decide_explicit(
        &self,
        request: &ScheduleRequest,
        prepared: &Prepared,
        bookings: &[Bookings],
        interval: Interval,
        started: Instant,
    ) -> Result<Decision, SchedulingError> {
        let guard = self.constraints(&prepared.interviewer, bookings, None);
        if let Err(err) = guard.check(&interval, request.force) {
            self.reject(SchedulingAction::Schedule, request.summary(), None, &err, started);
            return Err(err);
        }

        let snapshots = with_bookings(&prepared.snapshots, bookings, None);
        let blocks =
            shared_free_intervals(&snapshots, &context_window(&interval), self.settings.buffer());
        let context = self.context(
            prepared,
            &blocks,
            request.preferred_time,
            request.priority,
        );
        let chosen = self.scorer.candidate(interval, &context);
        let interview = self.new_interview(request, interval)?;

        Ok(Decision {
            interview,
            chosen,
            alternatives: Vec::new(),
        })
    }

    fn decide_search(
        &self,
        request: &ScheduleRequest,
        prepared: &Prepared,
        bookings: &[Bookings],
        duration: Duration,
    ) -> Result<(Option<Decision>, usize), SchedulingError> {
        let (mut candidates, evaluated) = self.ranked_candidates(
            prepared,
            bookings,
            request.window,
            duration,
            request.preferred_time,
            request.priority,
        )?;
        debug!(
            slots_evaluated = evaluated,
            viable = candidates.len(),
            "slot search finished"
        );

        if candidates.is_empty() {
            return Ok((None, evaluated));
        }

        let chosen = candidates.remove(0);
        candidates.truncate(self.settings.max_alternatives);
        let interview = self.new_interview(request, chosen.interval)?;

        Ok((
            Some(Decision {
                interview,
                chosen,
                alternatives: candidates,
            }),
            evaluated,
        ))
    }

    /// Enumerate, filter and rank every bookable slot in `window`.
    fn ranked_candidates(
        &self,
        prepared: &Prepared,
        bookings: &[Bookings],
        window: Interval,
        duration: Duration,
        preferred_time: Option<PreferredWindow>,
        priority: SchedulingPriority,
    ) -> Result<(Vec<SlotCandidate>, usize), SchedulingError> {
        let snapshots = with_bookings(&prepared.snapshots, bookings, None);
        let search = SlotSearch::new(
            window,
            duration,
            self.settings.buffer(),
            self.settings.granularity(),
        )?;
        let slots = find_slots(&snapshots, search);
        let blocks = slots.blocks().to_vec();
        let context = self.context(prepared, &blocks, preferred_time, priority);
        let guard = self.constraints(&prepared.interviewer, bookings, None);

        let mut evaluated = 0;
        let mut candidates = Vec::new();
        for slot in slots {
            evaluated += 1;
            if guard.check(&slot, false).is_err() {
                continue;
            }
            candidates.push(self.scorer.candidate(slot, &context));
        }
        rank(&mut candidates);
        Ok((candidates, evaluated))
    }

    /// Move a confirmed interview to a new interval after a full conflict and scoring pass.
    pub async fn reschedule(
        &self,
        id: &InterviewId,
        request: RescheduleRequest,
    ) -> Result<Interview, SchedulingError> {
        let started = Instant::now();
        let limit = self.settings.timeout_for(request.timeout_ms);
        let summary = format!(
            "reschedule {id} to {}..{}",
            request.new_interval.start().to_rfc3339(),
            request.new_interval.end().to_rfc3339()
        );

        validate_duration(request.new_interval.duration().num_minutes())?;
        let existing = self.load(id, limit).await?;
        if existing.status.is_terminal() {
            let err = SchedulingError::TerminalState {
                id: id.clone(),
                status: existing.status,
            };
            self.reject(SchedulingAction::Reschedule, summary, Some(id), &err, started);
            return Err(err);
        }

        let interviewer = self.participant(&existing.interviewer_id, None, limit).await?;
        let candidate = self.participant(&existing.candidate_id, None, limit).await?;
        let job = self.optional_job(&existing.job_id, limit).await?;
        let read_window = context_window(&request.new_interval);
        let prepared = self
            .prepare(interviewer, candidate, job, &read_window, limit)
            .await?;

        let interview = {
            let _guard = self
                .locks
                .acquire([&prepared.interviewer.id, &prepared.candidate.id])
                .await;

            let mut current = self.load(id, limit).await?;
            if current.status.is_terminal() {
                let err = SchedulingError::TerminalState {
                    id: id.clone(),
                    status: current.status,
                };
                self.reject(SchedulingAction::Reschedule, summary, Some(id), &err, started);
                return Err(err);
            }
            if current.reschedule_count >= self.settings.max_reschedules {
                let err = SchedulingError::from(ValidationError::RescheduleLimitReached {
                    id: id.clone(),
                    count: current.reschedule_count,
                    limit: self.settings.max_reschedules,
                });
                self.reject(SchedulingAction::Reschedule, summary, Some(id), &err, started);
                return Err(err);
            }

            let bookings = self
                .bookings(&[&prepared.interviewer.id, &prepared.candidate.id], limit)
                .await?;
            let bookings = with_calendar(bookings, &prepared.snapshots);
            let guard = self.constraints(&prepared.interviewer, &bookings, Some(id));
            if let Err(err) = guard.check(&request.new_interval, request.force) {
                self.reject(SchedulingAction::Reschedule, summary, Some(id), &err, started);
                return Err(err);
            }

            let snapshots = with_bookings(&prepared.snapshots, &bookings, Some(id));
            let blocks = shared_free_intervals(&snapshots, &read_window, self.settings.buffer());
            let context = self.context(&prepared, &blocks, None, SchedulingPriority::High);
            let score = self.scorer.score(&request.new_interval, &context);

            let previous = current.interval;
            let now = (self.clock)();
            if let Err(err) = current.reschedule(request.new_interval, &request.reason, now) {
                let err = SchedulingError::transition(id, err);
                self.reject(SchedulingAction::Reschedule, summary, Some(id), &err, started);
                return Err(err);
            }

            let mut draft = self.draft(
                SchedulingAction::Reschedule,
                summary,
                DecisionOutcome::Committed,
                request.reason.clone(),
                started,
            );
            draft.interview_id = Some(id.clone());
            draft.previous_slot = Some(previous);
            draft.chosen_slot = Some(current.interval);
            draft.slots_evaluated = 1;
            draft.best_score = Some(score.total);
            self.commit(&current, draft, limit).await?;
            current
        };

        info!(
            interview_id = %interview.id,
            start = %interview.interval.start(),
            reschedule_count = interview.reschedule_count,
            "interview rescheduled"
        );

        self.sync_calendar(&interview, limit).await;
        self.notify(
            NotificationEvent::Rescheduled,
            &interview,
            &[prepared.interviewer, prepared.candidate],
            limit,
        )
        .await;

        Ok(interview)
    }

    /// Cancel an interview. Cancelling twice is a no-op that returns the cancelled record.
    pub async fn cancel(
        &self,
        id: &InterviewId,
        request: CancelRequest,
    ) -> Result<Interview, SchedulingError> {
        let started = Instant::now();
        let limit = self.settings.upstream_timeout;

        let existing = self.load(id, limit).await?;
        if existing.status == InterviewStatus::Cancelled {
            return Ok(existing);
        }

        let interview = {
            let _guard = self.locks.acquire(existing.participant_ids()).await;

            let mut current = self.load(id, limit).await?;
            if current.status == InterviewStatus::Cancelled {
                return Ok(current);
            }

            let now = (self.clock)();
            if let Err(err) = current.transition(InterviewStatus::Cancelled, now) {
                let err = SchedulingError::transition(id, err);
                self.reject(SchedulingAction::Cancel, format!("cancel {id}"), Some(id), &err, started);
                return Err(err);
            }
            current.cancellation_reason = Some(request.reason.clone());

            let mut draft = self.draft(
                SchedulingAction::Cancel,
                format!("cancel {id}"),
                DecisionOutcome::Committed,
                request.reason.clone(),
                started,
            );
            draft.interview_id = Some(id.clone());
            draft.previous_slot = Some(current.interval);
            self.commit(&current, draft, limit).await?;
            current
        };

        info!(interview_id = %interview.id, reason = %request.reason, "interview cancelled");

        self.sync_calendar(&interview, limit).await;
        let participants = self.participants_best_effort(&interview, limit).await;
        self.notify(NotificationEvent::Cancelled, &interview, &participants, limit)
            .await;

        Ok(interview)
    }

    /// Mark a confirmed interview as held. Completing twice returns the completed record.
    pub async fn complete(&self, id: &InterviewId) -> Result<Interview, SchedulingError> {
        let started = Instant::now();
        let limit = self.settings.upstream_timeout;

        let existing = self.load(id, limit).await?;
        if existing.status == InterviewStatus::Completed {
            return Ok(existing);
        }

        let interview = {
            let _guard = self.locks.acquire(existing.participant_ids()).await;

            let mut current = self.load(id, limit).await?;
            if current.status == InterviewStatus::Completed {
                return Ok(current);
            }

            let now = (self.clock)();
            if let Err(err) = current.transition(InterviewStatus::Completed, now) {
                let err = SchedulingError::transition(id, err);
                self.reject(
                    SchedulingAction::Complete,
                    format!("complete {id}"),
                    Some(id),
                    &err,
                    started,
                );
                return Err(err);
            }

            let mut draft = self.draft(
                SchedulingAction::Complete,
                format!("complete {id}"),
                DecisionOutcome::Committed,
                "interview held",
                started,
            );
            draft.interview_id = Some(id.clone());
            draft.chosen_slot = Some(current.interval);
            self.commit(&current, draft, limit).await?;
            current
        };

        info!(interview_id = %interview.id, "interview completed");
        self.sync_calendar(&interview, limit).await;
        Ok(interview)
    }

    pub async fn get(&self, id: &InterviewId) -> Result<Interview, SchedulingError> {
        self.load(id, self.settings.upstream_timeout).await
    }

    /// Dry-run conflict check. Reads only; takes no locks.
    pub async fn detect_conflicts(
        &self,
        query: ConflictQuery,
    ) -> Result<Vec<ConflictRecord>, SchedulingError> {
        let limit = self.settings.timeout_for(query.timeout_ms);
        if query.participant_ids.is_empty() {
            return Err(ValidationError::NoParticipants.into());
        }

        let mut snapshots = Vec::with_capacity(query.participant_ids.len());
        for id in &query.participant_ids {
            let participant = self.participant(id, None, limit).await?;
            snapshots.push(self.snapshot(participant, &query.interval, limit).await?);
        }
        let ids: Vec<&ParticipantId> = query.participant_ids.iter().collect();
        let bookings = with_calendar(self.bookings(&ids, limit).await?, &snapshots);
        Ok(detect_conflicts(&query.interval, &bookings, None))
    }

    /// Ranked bookable slots for a participant set. Read-only; safe to abandon.
    pub async fn find_availability(
        &self,
        request: AvailabilityRequest,
    ) -> Result<Vec<SlotCandidate>, SchedulingError> {
        let limit = self.settings.timeout_for(request.timeout_ms);
        let duration = validate_duration(i64::from(request.duration_minutes))?;
        if request.participant_ids.is_empty() {
            return Err(ValidationError::NoParticipants.into());
        }
        validate_range(&request.range)?;

        let mut participants = Vec::with_capacity(request.participant_ids.len());
        for id in &request.participant_ids {
            participants.push(self.participant(id, None, limit).await?);
        }
        let job = match &request.job_id {
            Some(job_id) => Some(self.job(job_id, limit).await?),
            None => None,
        };

        // The first interviewer anchors preference timezone, workload and the daily cap.
        let anchor = participants
            .iter()
            .find(|participant| participant.role == ParticipantRole::Interviewer)
            .or_else(|| participants.first())
            .cloned()
            .ok_or(ValidationError::NoParticipants)?;
        let counterpart = participants
            .iter()
            .find(|participant| participant.role == ParticipantRole::Candidate)
            .unwrap_or(&anchor)
            .clone();

        let mut snapshots = Vec::with_capacity(participants.len());
        for participant in participants {
            snapshots.push(self.snapshot(participant, &request.range, limit).await?);
        }
        let cohort = self.cohort_workloads(limit).await?;
        let prepared = Prepared {
            interviewer: anchor,
            candidate: counterpart,
            job,
            snapshots,
            cohort,
        };

        let ids: Vec<&ParticipantId> = request.participant_ids.iter().collect();
        let bookings = with_calendar(self.bookings(&ids, limit).await?, &prepared.snapshots);
        let (mut candidates, evaluated) = self.ranked_candidates(
            &prepared,
            &bookings,
            request.range,
            duration,
            request.preferred_time,
            request.priority,
        )?;

        let max_results = request
            .max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .min(MAX_RESULTS_CAP);
        candidates.truncate(max_results);
        debug!(
            slots_evaluated = evaluated,
            returned = candidates.len(),
            "availability search finished"
        );
        Ok(candidates)
    }

    /// Working hours, active bookings and free time per participant over a range.
    pub async fn availability_summary(
        &self,
        request: SummaryRequest,
    ) -> Result<Vec<AvailabilitySummary>, SchedulingError> {
        let limit = self.settings.timeout_for(request.timeout_ms);
        if request.participant_ids.is_empty() {
            return Err(ValidationError::NoParticipants.into());
        }
        validate_range(&request.range)?;

        let mut summaries = Vec::with_capacity(request.participant_ids.len());
        for id in &request.participant_ids {
            let participant = self.participant(id, None, limit).await?;
            let snapshot = self.snapshot(participant, &request.range, limit).await?;
            let bookings = self.bookings(&[id], limit).await?;
            let snapshot = overlay(&snapshot, &bookings, None);

            let free_minutes = free_intervals(&snapshot, &request.range, Buffer::none())
                .iter()
                .map(|interval| interval.duration().num_minutes())
                .sum::<i64>();
            let active_interviews = bookings
                .iter()
                .flat_map(Bookings::active)
                .filter(|interview| interview.interval.overlaps(&request.range))
                .count();

            summaries.push(AvailabilitySummary {
                participant_id: snapshot.participant.id.0.clone(),
                role: snapshot.participant.role.label(),
                timezone: snapshot.participant.timezone.name().to_string(),
                working_hours: snapshot.participant.working_hours.clone(),
                active_interviews,
                busy_intervals: snapshot.busy.overlapping(&request.range).count(),
                free_minutes,
            });
        }
        Ok(summaries)
    }

    pub fn log_entries(&self) -> Result<Vec<SchedulingLogEntry>, SchedulingError> {
        self.ports
            .log
            .entries()
            .map_err(|err| SchedulingError::AuditLog(err.to_string()))
    }

    pub fn analytics(
        &self,
        range: Option<&Interval>,
    ) -> Result<SchedulingAnalytics, SchedulingError> {
        Ok(analytics(&self.log_entries()?, range))
    }

    async fn prepare(
        &self,
        interviewer: Participant,
        candidate: Participant,
        job: Option<Job>,
        window: &Interval,
        limit: StdDuration,
    ) -> Result<Prepared, SchedulingError> {
        let snapshots = vec![
            self.snapshot(interviewer.clone(), window, limit).await?,
            self.snapshot(candidate.clone(), window, limit).await?,
        ];
        let cohort = self.cohort_workloads(limit).await?;
        Ok(Prepared {
            interviewer,
            candidate,
            job,
            snapshots,
            cohort,
        })
    }

    fn constraints<'a>(
        &self,
        interviewer: &'a Participant,
        bookings: &'a [Bookings],
        exclude: Option<&'a InterviewId>,
    ) -> HardConstraints<'a> {
        HardConstraints {
            interviewer,
            bookings,
            exclude,
            buffer: self.settings.buffer(),
            max_daily: self.settings.max_daily_interviews,
        }
    }

    fn context<'a>(
        &self,
        prepared: &'a Prepared,
        blocks: &'a [Interval],
        preferred_time: Option<PreferredWindow>,
        priority: SchedulingPriority,
    ) -> SchedulingContext<'a> {
        SchedulingContext {
            now: (self.clock)(),
            preferred_time,
            preference_timezone: prepared.interviewer.timezone,
            preference_tolerance_minutes: self.settings.preference_tolerance_minutes,
            candidate_preference: prepared.candidate.preferred_day_part,
            candidate_timezone: prepared.candidate.timezone,
            free_blocks: blocks,
            interviewer_workload: prepared.interviewer.current_workload,
            cohort_workloads: &prepared.cohort,
            deadline: prepared.job.as_ref().and_then(|job| job.target_fill_date),
            priority,
        }
    }

    fn new_interview(
        &self,
        request: &ScheduleRequest,
        interval: Interval,
    ) -> Result<Interview, SchedulingError> {
        let now = (self.clock)();
        let mut interview = Interview {
            id: next_interview_id(),
            candidate_id: request.candidate_id.clone(),
            job_id: request.job_id.clone(),
            interviewer_id: request.interviewer_id.clone(),
            interval,
            location: request.location.clone(),
            interview_type: request.interview_type,
            status: InterviewStatus::Requested,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
            reschedule_count: 0,
            history: Vec::new(),
            cancellation_reason: None,
        };
        interview
            .transition(InterviewStatus::Confirmed, now)
            .map_err(|err| SchedulingError::transition(&interview.id, err))?;
        Ok(interview)
    }

    /// Log first, then persist. A failed save is compensated in the log and reported.
    async fn commit(
        &self,
        interview: &Interview,
        draft: LogEntryDraft,
        limit: StdDuration,
    ) -> Result<(), SchedulingError> {
        let recorded = self
            .ports
            .log
            .append(draft.clone())
            .map_err(|err| SchedulingError::AuditLog(err.to_string()))?;

        let failure = match bounded(PERSISTENCE, limit, self.ports.store.save(interview)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => UpstreamError::Unavailable {
                service: PERSISTENCE,
                reason: err.to_string(),
            },
            Err(timeout) => timeout,
        };

        let mut compensation = draft;
        compensation.at = (self.clock)();
        compensation.outcome = DecisionOutcome::Failed;
        compensation.reason = format!("not persisted: {failure}");
        compensation.compensates = Some(recorded.sequence);
        if let Err(err) = self.ports.log.append(compensation) {
            warn!(interview_id = %interview.id, error = %err, "compensating log entry failed");
        }
        warn!(interview_id = %interview.id, error = %failure, "interview save failed");
        Err(failure.into())
    }

    fn draft(
        &self,
        action: SchedulingAction,
        summary: String,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
        started: Instant,
    ) -> LogEntryDraft {
        let mut draft = LogEntryDraft::new((self.clock)(), action, summary, outcome, reason);
        draft.processing_time_ms = elapsed_ms(started);
        draft
    }

    fn reject(
        &self,
        action: SchedulingAction,
        summary: String,
        id: Option<&InterviewId>,
        err: &SchedulingError,
        started: Instant,
    ) {
        let mut draft = self.draft(action, summary, DecisionOutcome::Rejected, err.to_string(), started);
        draft.interview_id = id.cloned();
        self.note(draft);
    }

    /// Append an entry that does not guard a commit; failures are reported, not raised.
    fn note(&self, draft: LogEntryDraft) {
        if let Err(err) = self.ports.log.append(draft) {
            warn!(error = %err, "scheduling log append failed");
        }
    }

    async fn participant(
        &self,
        id: &ParticipantId,
        expected: Option<ParticipantRole>,
        limit: StdDuration,
    ) -> Result<Participant, SchedulingError> {
        let participant = bounded(DIRECTORY, limit, self.ports.directory.participant(id))
            .await?
            .map_err(|err| match err {
                DirectoryError::NotFound => {
                    SchedulingError::from(ValidationError::ParticipantNotFound(id.clone()))
                }
                DirectoryError::Unavailable(reason) => directory_down(reason),
            })?;

        if let Some(role) = expected {
            if participant.role != role {
                return Err(ValidationError::UnexpectedRole {
                    id: id.clone(),
                    expected: role,
                }
                .into());
            }
        }
        Ok(participant)
    }

    async fn job(&self, id: &JobId, limit: StdDuration) -> Result<Job, SchedulingError> {
        bounded(DIRECTORY, limit, self.ports.directory.job(id))
            .await?
            .map_err(|err| match err {
                DirectoryError::NotFound => {
                    SchedulingError::from(ValidationError::JobNotFound(id.0.clone()))
                }
                DirectoryError::Unavailable(reason) => directory_down(reason),
            })
    }

    /// Job lookup for existing interviews; a since-closed job only loses its deadline.
    async fn optional_job(
        &self,
        id: &JobId,
        limit: StdDuration,
    ) -> Result<Option<Job>, SchedulingError> {
        match bounded(DIRECTORY, limit, self.ports.directory.job(id)).await? {
            Ok(job) => Ok(Some(job)),
            Err(DirectoryError::NotFound) => Ok(None),
            Err(DirectoryError::Unavailable(reason)) => Err(directory_down(reason)),
        }
    }

    async fn cohort_workloads(&self, limit: StdDuration) -> Result<Vec<u32>, SchedulingError> {
        let interviewers = bounded(DIRECTORY, limit, self.ports.directory.interviewers())
            .await?
            .map_err(|err| directory_down(err.to_string()))?;
        Ok(interviewers
            .iter()
            .map(|participant| participant.current_workload)
            .collect())
    }

    async fn snapshot(
        &self,
        participant: Participant,
        window: &Interval,
        limit: StdDuration,
    ) -> Result<ParticipantSnapshot, SchedulingError> {
        let buffer = self.settings.buffer();
        let padded = window.padded(buffer.after, buffer.before);
        let busy = bounded(
            CALENDAR,
            limit,
            self.ports.calendar.busy_intervals(&participant.id, &padded),
        )
        .await?
        .map_err(|err| UpstreamError::Unavailable {
            service: CALENDAR,
            reason: err.to_string(),
        })?;
        Ok(ParticipantSnapshot { participant, busy })
    }

    async fn bookings(
        &self,
        participants: &[&ParticipantId],
        limit: StdDuration,
    ) -> Result<Vec<Bookings>, SchedulingError> {
        let mut bookings = Vec::with_capacity(participants.len());
        for participant in participants {
            let interviews = bounded(PERSISTENCE, limit, self.ports.store.list_active(participant))
                .await?
                .map_err(|err| UpstreamError::Unavailable {
                    service: PERSISTENCE,
                    reason: err.to_string(),
                })?;
            bookings.push(Bookings::new((*participant).clone(), interviews));
        }
        Ok(bookings)
    }

    async fn load(&self, id: &InterviewId, limit: StdDuration) -> Result<Interview, SchedulingError> {
        match bounded(PERSISTENCE, limit, self.ports.store.find(id)).await? {
            Ok(Some(interview)) => Ok(interview),
            Ok(None) | Err(RepositoryError::NotFound) => {
                Err(SchedulingError::InterviewNotFound(id.clone()))
            }
            Err(RepositoryError::Unavailable(reason)) => Err(UpstreamError::Unavailable {
                service: PERSISTENCE,
                reason,
            }
            .into()),
        }
    }

    async fn participants_best_effort(
        &self,
        interview: &Interview,
        limit: StdDuration,
    ) -> Vec<Participant> {
        let mut participants = Vec::with_capacity(2);
        for id in interview.participant_ids() {
            match self.participant(id, None, limit).await {
                Ok(participant) => participants.push(participant),
                Err(err) => {
                    warn!(interview_id = %interview.id, participant = %id, error = %err, "participant lookup for notification failed")
                }
            }
        }
        participants
    }

    /// Mirror the record into the calendar. Persistence stays authoritative on failure.
    async fn sync_calendar(&self, interview: &Interview, limit: StdDuration) {
        match bounded(CALENDAR, limit, self.ports.calendar.commit_interview(interview)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(interview_id = %interview.id, error = %err, "calendar commit failed")
            }
            Err(err) => {
                warn!(interview_id = %interview.id, error = %err, "calendar commit timed out")
            }
        }
    }

    async fn notify(
        &self,
        event: NotificationEvent,
        interview: &Interview,
        participants: &[Participant],
        limit: StdDuration,
    ) {
        let sent = bounded(
            NOTIFIER,
            limit,
            self.ports.notifier.notify(event, interview, participants),
        )
        .await;
        match sent {
            Ok(Ok(())) => {
                debug!(interview_id = %interview.id, event = event.label(), "participants notified")
            }
            Ok(Err(err)) => {
                warn!(interview_id = %interview.id, event = event.label(), error = %err, "notification failed")
            }
            Err(err) => {
                warn!(interview_id = %interview.id, event = event.label(), error = %err, "notification timed out")
            }
        }
    }
}

/// Constraints a booking must meet unless explicitly forced.
struct HardConstraints<'a> {
    interviewer: &'a Participant,
    bookings: &'a [Bookings],
    exclude: Option<&'a InterviewId>,
    buffer: Buffer,
    max_daily: u32,
}

impl HardConstraints<'_> {
    /// Rejects overlaps with booked or calendar-busy time, including the idle buffer
    /// required on each side of the proposed interval.
    fn check(&self, interval: &Interval, force: bool) -> Result<(), SchedulingError> {
        let guarded = interval.padded(self.buffer.before, self.buffer.after);
        let conflicts = detect_conflicts(&guarded, self.bookings, self.exclude);
        if force {
            if !conflicts.is_empty() {
                warn!(
                    conflicts = conflicts.len(),
                    interviewer = %self.interviewer.id,
                    "forced booking overrides conflicts"
                );
            }
            return Ok(());
        }

        if !self
            .interviewer
            .working_hours
            .permits(self.interviewer.timezone, interval)
        {
            return Err(
                ValidationError::OutsideWorkingHours(self.interviewer.id.clone()).into(),
            );
        }
        if !conflicts.is_empty() {
            return Err(SchedulingError::Conflict { conflicts });
        }
        if self.daily_load(interval) >= self.max_daily {
            return Err(ValidationError::DailyLimitReached {
                participant: self.interviewer.id.clone(),
                limit: self.max_daily,
            }
            .into());
        }
        Ok(())
    }

    /// Active interviews the interviewer already has on the slot's local calendar day.
    fn daily_load(&self, interval: &Interval) -> u32 {
        let tz: Tz = self.interviewer.timezone;
        let day = interval.start().with_timezone(&tz).date_naive();
        self.bookings
            .iter()
            .filter(|bookings| bookings.participant_id == self.interviewer.id)
            .flat_map(Bookings::active)
            .filter(|interview| self.exclude != Some(&interview.id))
            .filter(|interview| interview.interviewer_id == self.interviewer.id)
            .filter(|interview| interview.interval.start().with_timezone(&tz).date_naive() == day)
            .count() as u32
    }
}

/// Overlay persisted bookings on calendar busy time; persistence may be ahead of the calendar.
fn with_bookings(
    snapshots: &[ParticipantSnapshot],
    bookings: &[Bookings],
    exclude: Option<&InterviewId>,
) -> Vec<ParticipantSnapshot> {
    snapshots
        .iter()
        .map(|snapshot| overlay(snapshot, bookings, exclude))
        .collect()
}

fn overlay(
    snapshot: &ParticipantSnapshot,
    bookings: &[Bookings],
    exclude: Option<&InterviewId>,
) -> ParticipantSnapshot {
    let own = bookings
        .iter()
        .filter(|entry| entry.participant_id == snapshot.participant.id)
        .flat_map(Bookings::active);
    let mut calendar = snapshot.busy.clone();
    let mut booked = BusySet::new();
    for interview in own {
        if exclude == Some(&interview.id) {
            // The calendar still holds the slot being moved away from.
            calendar = calendar.excluding(&interview.interval);
        } else {
            booked.insert(interview.interval);
        }
    }
    ParticipantSnapshot {
        participant: snapshot.participant.clone(),
        busy: calendar.union(&booked),
    }
}

/// Attach each participant's calendar busy time to their persisted bookings.
fn with_calendar(bookings: Vec<Bookings>, snapshots: &[ParticipantSnapshot]) -> Vec<Bookings> {
    bookings
        .into_iter()
        .map(|entry| {
            let busy = snapshots
                .iter()
                .find(|snapshot| snapshot.participant.id == entry.participant_id)
                .map(|snapshot| snapshot.busy.clone())
                .unwrap_or_default();
            entry.with_busy(busy)
        })
        .collect()
}

fn context_window(interval: &Interval) -> Interval {
    let padding = Duration::hours(CONTEXT_PADDING_HOURS);
    interval.padded(padding, padding)
}

fn validate_range(range: &Interval) -> Result<(), ValidationError> {
    if range.duration() > Duration::days(MAX_SEARCH_DAYS) {
        return Err(ValidationError::InvalidRange(format!(
            "range may span at most {MAX_SEARCH_DAYS} days"
        )));
    }
    Ok(())
}

fn validate_duration(minutes: i64) -> Result<Duration, ValidationError> {
    let allowed = i64::from(MIN_DURATION_MINUTES)..=i64::from(MAX_DURATION_MINUTES);
    if allowed.contains(&minutes) {
        Ok(Duration::minutes(minutes))
    } else {
        Err(ValidationError::InvalidDuration(minutes))
    }
}

fn directory_down(reason: String) -> SchedulingError {
    UpstreamError::Unavailable {
        service: DIRECTORY,
        reason,
    }
    .into()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Bound a collaborator call; expiry becomes a retryable upstream timeout.
async fn bounded<F>(
    service: &'static str,
    limit: StdDuration,
    call: F,
) -> Result<F::Output, UpstreamError>
where
    F: Future,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| UpstreamError::Timeout {
            service,
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })
}
