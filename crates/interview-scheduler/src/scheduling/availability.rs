//! Availability resolution: busy sets and working hours in, bookable slots out.
//!
//! Everything here is a pure function of the snapshot it is given. The same inputs always
//! produce the same slot sequence, so abandoning a search has no side effects.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::domain::Participant;
use super::error::ValidationError;
use super::interval::{intersect, subtract, BusySet, Interval};

/// Idle time required around a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffer {
    pub before: Duration,
    pub after: Duration,
}

impl Buffer {
    pub fn symmetric(minutes: i64) -> Self {
        Self {
            before: Duration::minutes(minutes),
            after: Duration::minutes(minutes),
        }
    }

    pub fn none() -> Self {
        Self::symmetric(0)
    }
}

/// Participant plus the busy intervals read for this request.
#[derive(Debug, Clone)]
pub struct ParticipantSnapshot {
    pub participant: Participant,
    pub busy: BusySet,
}

/// Shape of a slot search.
#[derive(Debug, Clone, Copy)]
pub struct SlotSearch {
    pub window: Interval,
    pub duration: Duration,
    pub buffer: Buffer,
    pub granularity: Duration,
}

impl SlotSearch {
    pub fn new(
        window: Interval,
        duration: Duration,
        buffer: Buffer,
        granularity: Duration,
    ) -> Result<Self, ValidationError> {
        if duration <= Duration::zero() {
            return Err(ValidationError::InvalidDuration(duration.num_minutes()));
        }
        if granularity <= Duration::zero() {
            return Err(ValidationError::InvalidRange(
                "slot granularity must be positive".to_string(),
            ));
        }
        Ok(Self {
            window,
            duration,
            buffer,
            granularity,
        })
    }
}

/// Free time for one participant: window minus buffered busy time, within working hours.
///
/// A slot needs `buffer.before` of idle time ahead of it and `buffer.after` behind it, so
/// each busy interval is widened by `after` on its leading edge and `before` on its
/// trailing edge.
pub fn free_intervals(snapshot: &ParticipantSnapshot, window: &Interval, buffer: Buffer) -> Vec<Interval> {
    let blocked = snapshot.busy.padded(buffer.after, buffer.before);
    let open = subtract(window, &blocked);
    let hours = snapshot
        .participant
        .working_hours
        .windows(snapshot.participant.timezone, window);
    intersect(&open, &hours)
}

/// Time every participant has free. An empty participant set has no shared time.
pub fn shared_free_intervals(
    snapshots: &[ParticipantSnapshot],
    window: &Interval,
    buffer: Buffer,
) -> Vec<Interval> {
    let mut iter = snapshots.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut shared = free_intervals(first, window, buffer);
    for snapshot in iter {
        if shared.is_empty() {
            break;
        }
        shared = intersect(&shared, &free_intervals(snapshot, window, buffer));
    }
    shared
}

/// Lazily enumerate bookable slots in ascending start order.
pub fn find_slots(snapshots: &[ParticipantSnapshot], search: SlotSearch) -> SlotIter {
    SlotIter::new(
        shared_free_intervals(snapshots, &search.window, search.buffer),
        search.duration,
        search.granularity,
    )
}

/// The shared free block a slot sits in, if any.
pub fn containing_block(blocks: &[Interval], slot: &Interval) -> Option<Interval> {
    let index = blocks.partition_point(|block| block.end() < slot.end());
    blocks
        .get(index)
        .filter(|block| block.contains(slot))
        .copied()
}

/// Slides a fixed-length slot across free blocks at a fixed step.
#[derive(Debug, Clone)]
pub struct SlotIter {
    blocks: Vec<Interval>,
    index: usize,
    cursor: Option<DateTime<Utc>>,
    duration: Duration,
    granularity: Duration,
}

impl SlotIter {
    fn new(blocks: Vec<Interval>, duration: Duration, granularity: Duration) -> Self {
        Self {
            blocks,
            index: 0,
            cursor: None,
            duration,
            granularity,
        }
    }

    /// Free blocks the iterator walks; also the input to availability-quality scoring.
    pub fn blocks(&self) -> &[Interval] {
        &self.blocks
    }
}

impl Iterator for SlotIter {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(block) = self.blocks.get(self.index).copied() {
            let start = self
                .cursor
                .unwrap_or_else(|| align_up(block.start(), self.granularity));
            let end = start.checked_add_signed(self.duration);

            if let Some(end) = end.filter(|end| *end <= block.end()) {
                match start.checked_add_signed(self.granularity) {
                    Some(next) => self.cursor = Some(next),
                    None => {
                        self.index += 1;
                        self.cursor = None;
                    }
                }
                if let Ok(slot) = Interval::new(start, end) {
                    return Some(slot);
                }
                continue;
            }

            self.index += 1;
            self.cursor = None;
        }
        None
    }
}

/// Round up to the next multiple of `granularity` since the epoch (quarter hours by default).
fn align_up(instant: DateTime<Utc>, granularity: Duration) -> DateTime<Utc> {
    let step = granularity.num_seconds().max(1);
    let seconds = instant.timestamp();
    let remainder = seconds.rem_euclid(step);
    let aligned = if remainder == 0 && instant.timestamp_subsec_nanos() == 0 {
        seconds
    } else {
        seconds - remainder + step
    };
    DateTime::from_timestamp(aligned, 0).unwrap_or(instant)
}

/// Per-participant view over a range, for the availability summary endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilitySummary {
    pub participant_id: String,
    pub role: &'static str,
    pub timezone: String,
    pub working_hours: super::policy::WorkingHours,
    pub active_interviews: usize,
    pub busy_intervals: usize,
    pub free_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::domain::{ParticipantId, ParticipantRole};
    use crate::scheduling::policy::WorkingHours;
    use chrono::{NaiveTime, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        // Tuesday
        Utc.with_ymd_and_hms(2025, 3, 4, hour, minute, 0)
            .single()
            .expect("valid")
    }

    fn span(start: (u32, u32), end: (u32, u32)) -> Interval {
        Interval::new(at(start.0, start.1), at(end.0, end.1)).expect("valid")
    }

    fn snapshot(id: &str, busy: Vec<Interval>) -> ParticipantSnapshot {
        ParticipantSnapshot {
            participant: Participant {
                id: ParticipantId(id.to_string()),
                name: id.to_string(),
                role: ParticipantRole::Interviewer,
                timezone: chrono_tz::UTC,
                working_hours: WorkingHours::business_days(),
                current_workload: 0,
                preferred_day_part: None,
            },
            busy: BusySet::from_intervals(busy),
        }
    }

    fn search(window: Interval, minutes: i64, buffer: i64) -> SlotSearch {
        SlotSearch::new(
            window,
            Duration::minutes(minutes),
            Buffer::symmetric(buffer),
            Duration::minutes(15),
        )
        .expect("valid search")
    }

    #[test]
    fn slots_respect_working_hours_and_ascend() {
        let snapshots = vec![snapshot("lee", Vec::new())];
        let slots: Vec<_> = find_slots(&snapshots, search(span((0, 0), (23, 0)), 60, 0)).collect();

        assert_eq!(slots.first().map(Interval::start), Some(at(9, 0)));
        assert_eq!(slots.last().map(Interval::end), Some(at(17, 0)));
        assert!(slots.windows(2).all(|pair| pair[0].start() < pair[1].start()));
        // 09:00 through 16:00 inclusive at 15 minute steps.
        assert_eq!(slots.len(), 29);
    }

    #[test]
    fn slots_avoid_buffered_busy_time() {
        let busy = vec![span((10, 0), (11, 0)), span((13, 0), (14, 0))];
        let snapshots = vec![snapshot("lee", busy.clone())];
        let buffer = Buffer::symmetric(15);
        let slots: Vec<_> =
            find_slots(&snapshots, search(span((9, 0), (17, 0)), 45, 15)).collect();

        assert!(!slots.is_empty());
        for slot in &slots {
            let guarded = slot.padded(buffer.before, buffer.after);
            assert!(busy.iter().all(|blocked| !blocked.overlaps(&guarded)), "{slot:?}");
        }
        assert_eq!(slots[0], span((9, 0), (9, 45)));
        assert!(slots.contains(&span((11, 15), (12, 0))));
    }

    #[test]
    fn shared_free_time_intersects_participants() {
        let snapshots = vec![
            snapshot("lee", vec![span((9, 0), (12, 0))]),
            snapshot("cand", vec![span((14, 0), (17, 0))]),
        ];
        let shared = shared_free_intervals(&snapshots, &span((9, 0), (17, 0)), Buffer::none());
        assert_eq!(shared, vec![span((12, 0), (14, 0))]);
    }

    #[test]
    fn fully_booked_window_yields_no_slots() {
        let snapshots = vec![snapshot("lee", vec![span((8, 0), (18, 0))])];
        let mut slots = find_slots(&snapshots, search(span((9, 0), (17, 0)), 30, 0));
        assert!(slots.next().is_none());
    }

    #[test]
    fn search_is_restartable() {
        let snapshots = vec![snapshot("lee", vec![span((11, 0), (12, 30))])];
        let request = search(span((9, 0), (17, 0)), 60, 10);
        let first: Vec<_> = find_slots(&snapshots, request).collect();
        let second: Vec<_> = find_slots(&snapshots, request).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn starts_align_to_granularity() {
        let snapshots = vec![snapshot("lee", vec![span((9, 0), (9, 7))])];
        let first = find_slots(&snapshots, search(span((9, 0), (12, 0)), 30, 0))
            .next()
            .expect("slot");
        assert_eq!(first.start(), at(9, 15));
    }

    #[test]
    fn candidate_working_hours_narrow_the_search() {
        let mut candidate = snapshot("cand", Vec::new());
        candidate.participant.working_hours = WorkingHours::every_day(
            NaiveTime::from_hms_opt(15, 0, 0).expect("time"),
            NaiveTime::from_hms_opt(20, 0, 0).expect("time"),
        );
        let snapshots = vec![snapshot("lee", Vec::new()), candidate];
        let slots: Vec<_> = find_slots(&snapshots, search(span((0, 0), (23, 0)), 60, 0)).collect();

        assert_eq!(slots.first().map(Interval::start), Some(at(15, 0)));
        assert_eq!(slots.last().map(Interval::end), Some(at(17, 0)));
    }

    #[test]
    fn containing_block_finds_surrounding_free_time() {
        let blocks = vec![span((9, 0), (10, 0)), span((12, 0), (17, 0))];
        assert_eq!(
            containing_block(&blocks, &span((13, 0), (14, 0))),
            Some(span((12, 0), (17, 0)))
        );
        assert_eq!(containing_block(&blocks, &span((9, 30), (10, 30))), None);
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert!(SlotSearch::new(
            span((9, 0), (10, 0)),
            Duration::zero(),
            Buffer::none(),
            Duration::minutes(15)
        )
        .is_err());
    }
}
