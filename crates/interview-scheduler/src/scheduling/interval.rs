//! Half-open UTC intervals and the set arithmetic the resolver and detector build on.
//!
//! Every comparison happens on `DateTime<Utc>`. Intervals are half-open, so an interval
//! ending at 11:00 and another starting at 11:00 are adjacent and do not overlap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Raised when an interval would not satisfy `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("interval start {start} must be before end {end}")]
    Malformed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("interval starting at {start} runs past the representable time range")]
    OutOfRange { start: DateTime<Utc> },
}

/// `[start, end)` on the absolute timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = IntervalError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(IntervalError::Malformed { start, end })
        }
    }

    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self, IntervalError> {
        let end = start
            .checked_add_signed(length)
            .ok_or(IntervalError::OutOfRange { start })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test; touching endpoints do not count.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        Interval::new(start, end).ok()
    }

    /// Widen the interval by `before` on the leading edge and `after` on the trailing edge.
    /// Saturates at the ends of the representable timeline.
    pub fn padded(&self, before: Duration, after: Duration) -> Interval {
        let start = self
            .start
            .checked_sub_signed(before.max(Duration::zero()))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = self
            .end
            .checked_add_signed(after.max(Duration::zero()))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Interval { start, end }
    }

    /// Smallest interval covering both.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Symmetric buffer around a booking.
    pub fn with_buffer(&self, buffer: Duration) -> Interval {
        self.padded(buffer, buffer)
    }
}

pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.overlaps(b)
}

/// Sort and coalesce intervals. Overlapping and adjacent inputs collapse into one.
pub fn merge<I>(intervals: I) -> Vec<Interval>
where
    I: IntoIterator<Item = Interval>,
{
    let mut sorted: Vec<Interval> = intervals.into_iter().collect();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Free time inside `window` once every busy interval is removed. Linear in the busy set.
pub fn subtract(window: &Interval, busy: &BusySet) -> Vec<Interval> {
    let mut free = Vec::new();
    let mut cursor = window.start;

    for blocked in busy.iter() {
        if blocked.end <= cursor {
            continue;
        }
        if blocked.start >= window.end {
            break;
        }
        if blocked.start > cursor {
            free.push(Interval {
                start: cursor,
                end: blocked.start,
            });
        }
        cursor = cursor.max(blocked.end);
        if cursor >= window.end {
            break;
        }
    }

    if cursor < window.end {
        free.push(Interval {
            start: cursor,
            end: window.end,
        });
    }
    free
}

/// Pairwise intersection of two sorted, non-overlapping interval lists.
pub fn intersect(left: &[Interval], right: &[Interval]) -> Vec<Interval> {
    let mut shared = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        if let Some(overlap) = left[i].intersection(&right[j]) {
            shared.push(overlap);
        }
        if left[i].end <= right[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    shared
}

/// Ordered, non-overlapping commitments for a single participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct BusySet {
    intervals: Vec<Interval>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes on ingestion: unsorted, overlapping or adjacent input is merged.
    pub fn from_intervals<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = Interval>,
    {
        Self {
            intervals: merge(intervals),
        }
    }

    pub fn insert(&mut self, interval: Interval) {
        let mut all = std::mem::take(&mut self.intervals);
        all.push(interval);
        self.intervals = merge(all);
    }

    pub fn union(&self, other: &BusySet) -> BusySet {
        BusySet::from_intervals(self.iter().chain(other.iter()).copied())
    }

    /// Every interval widened, then re-merged so the set stays normalized.
    pub fn padded(&self, before: Duration, after: Duration) -> BusySet {
        BusySet::from_intervals(
            self.intervals
                .iter()
                .map(|interval| interval.padded(before, after)),
        )
    }

    /// The set with `hole` carved out of every interval it touches.
    pub fn excluding(&self, hole: &Interval) -> BusySet {
        let mut kept = Vec::with_capacity(self.intervals.len() + 1);
        for interval in &self.intervals {
            if !interval.overlaps(hole) {
                kept.push(*interval);
                continue;
            }
            if interval.start < hole.start {
                kept.push(Interval {
                    start: interval.start,
                    end: hole.start,
                });
            }
            if hole.end < interval.end {
                kept.push(Interval {
                    start: hole.end,
                    end: interval.end,
                });
            }
        }
        BusySet { intervals: kept }
    }

    pub fn overlapping<'a>(&'a self, window: &'a Interval) -> impl Iterator<Item = &'a Interval> {
        self.intervals
            .iter()
            .take_while(move |interval| interval.start < window.end)
            .filter(move |interval| interval.overlaps(window))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn total_busy(&self) -> Duration {
        self.intervals
            .iter()
            .fold(Duration::zero(), |acc, interval| acc + interval.duration())
    }
}

impl From<Vec<Interval>> for BusySet {
    fn from(intervals: Vec<Interval>) -> Self {
        Self::from_intervals(intervals)
    }
}

impl From<BusySet> for Vec<Interval> {
    fn from(set: BusySet) -> Self {
        set.intervals
    }
}

impl FromIterator<Interval> for BusySet {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        Self::from_intervals(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, minute, 0)
            .single()
            .expect("valid instant")
    }

    fn span(start: (u32, u32), end: (u32, u32)) -> Interval {
        Interval::new(at(start.0, start.1), at(end.0, end.1)).expect("valid interval")
    }

    #[test]
    fn rejects_empty_and_inverted_intervals() {
        assert!(Interval::new(at(10, 0), at(10, 0)).is_err());
        assert!(matches!(
            Interval::new(at(11, 0), at(10, 0)),
            Err(IntervalError::Malformed { .. })
        ));
    }

    #[test]
    fn overlap_is_symmetric_and_half_open() {
        let morning = span((9, 0), (10, 0));
        let touching = span((10, 0), (11, 0));
        let crossing = span((9, 30), (10, 30));

        assert!(!overlaps(&morning, &touching));
        assert!(!overlaps(&touching, &morning));
        assert!(overlaps(&morning, &crossing));
        assert!(overlaps(&crossing, &morning));
        assert!(overlaps(&morning, &morning));
    }

    #[test]
    fn merge_coalesces_overlapping_and_adjacent_input() {
        let merged = merge(vec![
            span((13, 0), (14, 0)),
            span((9, 0), (10, 0)),
            span((10, 0), (10, 30)),
            span((9, 15), (9, 45)),
            span((15, 0), (16, 0)),
            span((13, 30), (15, 0)),
        ]);

        assert_eq!(merged, vec![span((9, 0), (10, 30)), span((13, 0), (16, 0))]);
    }

    #[test]
    fn subtract_returns_gaps_around_busy_blocks() {
        let window = span((8, 0), (17, 0));
        let busy = BusySet::from_intervals(vec![
            span((7, 0), (8, 30)),
            span((10, 0), (11, 0)),
            span((16, 30), (18, 0)),
        ]);

        let free = subtract(&window, &busy);

        assert_eq!(
            free,
            vec![span((8, 30), (10, 0)), span((11, 0), (16, 30))]
        );
    }

    #[test]
    fn subtract_of_fully_booked_window_is_empty() {
        let window = span((9, 0), (12, 0));
        let busy = BusySet::from_intervals(vec![span((8, 0), (12, 30))]);
        assert!(subtract(&window, &busy).is_empty());
    }

    #[test]
    fn intersect_keeps_only_shared_time() {
        let left = vec![span((9, 0), (12, 0)), span((13, 0), (17, 0))];
        let right = vec![span((11, 0), (14, 0)), span((16, 0), (18, 0))];

        assert_eq!(
            intersect(&left, &right),
            vec![
                span((11, 0), (12, 0)),
                span((13, 0), (14, 0)),
                span((16, 0), (17, 0)),
            ]
        );
    }

    #[test]
    fn padded_busy_set_merges_neighbours() {
        let busy = BusySet::from_intervals(vec![span((9, 0), (10, 0)), span((10, 20), (11, 0))]);
        let padded = busy.padded(Duration::minutes(15), Duration::minutes(15));
        assert_eq!(padded.as_slice(), &[span((8, 45), (11, 15))]);
    }

    #[test]
    fn excluding_carves_a_hole_out_of_busy_time() {
        let busy = BusySet::from_intervals(vec![span((9, 0), (12, 0)), span((14, 0), (15, 0))]);
        let carved = busy.excluding(&span((10, 0), (11, 0)));
        assert_eq!(
            carved.as_slice(),
            &[span((9, 0), (10, 0)), span((11, 0), (12, 0)), span((14, 0), (15, 0))]
        );
        assert_eq!(busy.excluding(&span((8, 0), (16, 0))).len(), 0);
    }

    #[test]
    fn with_buffer_expands_both_sides() {
        let booking = span((10, 0), (11, 0));
        assert_eq!(
            booking.with_buffer(Duration::minutes(10)),
            span((9, 50), (11, 10))
        );
    }

    #[test]
    fn padding_saturates_at_the_end_of_time() {
        let last = Interval::new(
            DateTime::<Utc>::MAX_UTC - Duration::minutes(30),
            DateTime::<Utc>::MAX_UTC,
        )
        .expect("valid interval");

        let padded = last.with_buffer(Duration::hours(12));
        assert_eq!(padded.end(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(padded.start(), last.start() - Duration::hours(12));

        assert!(matches!(
            Interval::starting_at(last.start(), Duration::hours(1)),
            Err(IntervalError::OutOfRange { .. })
        ));
    }

    #[test]
    fn deserializing_an_inverted_interval_fails() {
        let raw = r#"{"start":"2025-03-04T11:00:00Z","end":"2025-03-04T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Interval>(raw).is_err());

        let ok = r#"{"start":"2025-03-04T10:00:00Z","end":"2025-03-04T11:00:00Z"}"#;
        let interval: Interval = serde_json::from_str(ok).expect("valid interval");
        assert_eq!(interval, span((10, 0), (11, 0)));
    }
}
