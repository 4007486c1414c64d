//! Hard-conflict detection against active interviews and calendar busy time.
//!
//! Pure function over a per-request snapshot of each participant's commitments; the
//! orchestrator is responsible for reading that snapshot from persistence and the calendar.

use serde::{Deserialize, Serialize};

use super::domain::{Interview, InterviewId, ParticipantId};
use super::interval::{BusySet, Interval};

/// A commitment that overlaps a proposed interval for one participant.
///
/// `interview` is set when the commitment is a known interview; calendar-only busy time
/// carries just its interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub participant_id: ParticipantId,
    pub interval: Interval,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview: Option<Interview>,
}

impl ConflictRecord {
    pub fn interview_id(&self) -> Option<&InterviewId> {
        self.interview.as_ref().map(|interview| &interview.id)
    }

    pub fn is_calendar_busy(&self) -> bool {
        self.interview.is_none()
    }
}

/// Commitments for one participant: active interviews from persistence and busy time
/// from the calendar store.
#[derive(Debug, Clone)]
pub struct Bookings {
    pub participant_id: ParticipantId,
    pub interviews: Vec<Interview>,
    pub busy: BusySet,
}

impl Bookings {
    pub fn new(participant_id: ParticipantId, interviews: Vec<Interview>) -> Self {
        Self {
            participant_id,
            interviews,
            busy: BusySet::new(),
        }
    }

    pub fn with_busy(mut self, busy: BusySet) -> Self {
        self.busy = busy;
        self
    }

    pub fn active(&self) -> impl Iterator<Item = &Interview> {
        self.interviews.iter().filter(|interview| interview.is_active())
    }

    /// Calendar busy time not already explained by a known active interview.
    pub fn calendar_only(&self) -> BusySet {
        self.active().fold(self.busy.clone(), |busy, interview| {
            busy.excluding(&interview.interval)
        })
    }
}

/// Report every commitment overlapping `interval`, per participant.
///
/// `exclude` skips the interview being rescheduled so it never conflicts with itself; its
/// own calendar entry is skipped with it. Touching boundaries are not conflicts.
pub fn detect_conflicts(
    interval: &Interval,
    bookings: &[Bookings],
    exclude: Option<&InterviewId>,
) -> Vec<ConflictRecord> {
    let mut conflicts = Vec::new();

    for participant in bookings {
        for interview in participant.active() {
            if exclude == Some(&interview.id) {
                continue;
            }
            if interview.interval.overlaps(interval) {
                conflicts.push(ConflictRecord {
                    participant_id: participant.participant_id.clone(),
                    interval: interview.interval,
                    interview: Some(interview.clone()),
                });
            }
        }

        for busy in participant.calendar_only().overlapping(interval) {
            conflicts.push(ConflictRecord {
                participant_id: participant.participant_id.clone(),
                interval: *busy,
                interview: None,
            });
        }
    }

    conflicts.sort_by(|a, b| {
        a.interval
            .cmp(&b.interval)
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::domain::{InterviewStatus, InterviewType, JobId};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, 0, 0)
            .single()
            .expect("valid")
    }

    fn booking(id: &str, start: u32, end: u32, status: InterviewStatus) -> Interview {
        Interview {
            id: InterviewId(id.to_string()),
            candidate_id: ParticipantId("cand-9".to_string()),
            job_id: JobId("job-1".to_string()),
            interviewer_id: ParticipantId("lee@example.com".to_string()),
            interval: Interval::new(at(start), at(end)).expect("valid"),
            location: String::new(),
            interview_type: InterviewType::Technical,
            status,
            notes: None,
            created_at: at(0),
            updated_at: at(0),
            reschedule_count: 0,
            history: Vec::new(),
            cancellation_reason: None,
        }
    }

    fn lee(interviews: Vec<Interview>) -> Bookings {
        Bookings::new(ParticipantId("lee@example.com".to_string()), interviews)
    }

    #[test]
    fn reports_overlapping_active_interviews() {
        let bookings = vec![lee(vec![
            booking("a", 10, 11, InterviewStatus::Confirmed),
            booking("b", 13, 14, InterviewStatus::Confirmed),
        ])];
        let proposed = Interval::new(at(10), at(11)).expect("valid");

        let conflicts = detect_conflicts(&proposed, &bookings, None);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].interview_id().map(|id| id.0.as_str()), Some("a"));
        assert_eq!(conflicts[0].participant_id.0, "lee@example.com");
    }

    #[test]
    fn adjacent_bookings_are_not_conflicts() {
        let bookings = vec![lee(vec![booking("a", 10, 11, InterviewStatus::Confirmed)])];
        let before = Interval::new(at(9), at(10)).expect("valid");
        let after = Interval::new(at(11), at(12)).expect("valid");

        assert!(detect_conflicts(&before, &bookings, None).is_empty());
        assert!(detect_conflicts(&after, &bookings, None).is_empty());
    }

    #[test]
    fn cancelled_and_completed_interviews_never_conflict() {
        let bookings = vec![lee(vec![
            booking("c", 10, 11, InterviewStatus::Cancelled),
            booking("d", 10, 11, InterviewStatus::Completed),
        ])];
        let proposed = Interval::new(at(10), at(11)).expect("valid");
        assert!(detect_conflicts(&proposed, &bookings, None).is_empty());
    }

    #[test]
    fn excluded_interview_does_not_conflict_with_itself() {
        let bookings = vec![lee(vec![booking("a", 10, 11, InterviewStatus::Confirmed)])];
        let proposed = Interval::new(at(10), at(12)).expect("valid");
        let own = InterviewId("a".to_string());
        assert!(detect_conflicts(&proposed, &bookings, Some(&own)).is_empty());
    }

    #[test]
    fn calendar_busy_time_conflicts_without_an_interview() {
        let standup = Interval::new(at(9), at(10)).expect("valid");
        let bookings = vec![lee(vec![]).with_busy(BusySet::from_intervals(vec![standup]))];

        let proposed = Interval::new(at(9), at(11)).expect("valid");

        let conflicts = detect_conflicts(&proposed, &bookings, None);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].is_calendar_busy());
        assert_eq!(conflicts[0].interval, standup);

        let after = Interval::new(at(10), at(11)).expect("valid");
        assert!(detect_conflicts(&after, &bookings, None).is_empty());
    }

    #[test]
    fn calendar_copy_of_a_booking_is_reported_once() {
        let booked = booking("a", 10, 11, InterviewStatus::Confirmed);
        let busy = BusySet::from_intervals(vec![
            Interval::new(at(9), at(10)).expect("valid"),
            booked.interval,
        ]);
        let bookings = vec![lee(vec![booked]).with_busy(busy)];
        let proposed = Interval::new(at(10), at(11)).expect("valid");

        let conflicts = detect_conflicts(&proposed, &bookings, None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].interview_id().map(|id| id.0.as_str()), Some("a"));

        let own = InterviewId("a".to_string());
        assert!(detect_conflicts(&proposed, &bookings, Some(&own)).is_empty());
    }

    #[test]
    fn shared_interview_reported_once_per_participant() {
        let shared = booking("a", 10, 11, InterviewStatus::Confirmed);
        let bookings = vec![
            lee(vec![shared.clone()]),
            Bookings::new(ParticipantId("cand-9".to_string()), vec![shared]),
        ];
        let proposed = Interval::new(at(10), at(11)).expect("valid");

        let conflicts = detect_conflicts(&proposed, &bookings, None);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].participant_id.0, "cand-9");
    }
}
