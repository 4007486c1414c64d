use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::interval::{merge, Interval};

/// Per-weekday bookable hours expressed in the participant's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days: Vec<Weekday>,
}

impl WorkingHours {
    /// 09:00-17:00, Monday through Friday.
    pub fn business_days() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    pub fn every_day(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
        }
    }

    /// Bookable windows inside `range`, converted to UTC one local calendar day at a time.
    ///
    /// Converting per date keeps the wall-clock policy correct on daylight-saving
    /// transitions, where the UTC offset of 09:00 differs from the previous day.
    pub fn windows(&self, timezone: Tz, range: &Interval) -> Vec<Interval> {
        if self.start == self.end || self.days.is_empty() {
            return Vec::new();
        }

        let opening = range.start().with_timezone(&timezone).date_naive();
        let first = opening.pred_opt().unwrap_or(opening);
        let last = range.end().with_timezone(&timezone).date_naive();

        let mut windows = Vec::new();
        let mut date = first;
        while date <= last {
            if self.days.contains(&date.weekday()) {
                if let Some(window) = self.window_on(timezone, date) {
                    if let Some(clipped) = window.intersection(range) {
                        windows.push(clipped);
                    }
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        merge(windows)
    }

    /// True when the whole interval sits inside a single working window.
    pub fn permits(&self, timezone: Tz, interval: &Interval) -> bool {
        self.windows(timezone, interval)
            .iter()
            .any(|window| window.contains(interval))
    }

    fn window_on(&self, timezone: Tz, date: NaiveDate) -> Option<Interval> {
        let start = local_instant(timezone, date, self.start)?;
        let end_date = if self.end > self.start {
            date
        } else {
            date.succ_opt()?
        };
        let end = local_instant(timezone, end_date, self.end)?;
        Interval::new(start, end).ok()
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self::business_days()
    }
}

/// Resolve a wall-clock time on a given date to an absolute instant.
///
/// Ambiguous times (clocks falling back) take the earlier instant; times skipped by a
/// spring-forward gap move to the first valid instant an hour later.
pub fn local_instant(timezone: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(time);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            let shifted = naive.checked_add_signed(Duration::hours(1))?;
            timezone.from_local_datetime(&shifted).earliest()
        })
        .map(|instant| instant.with_timezone(&Utc))
}

/// Coarse time-of-day preference a candidate can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    pub const fn label(self) -> &'static str {
        match self {
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Evening => "evening",
        }
    }

    const fn hours(self) -> (u32, u32) {
        match self {
            DayPart::Morning => (8, 12),
            DayPart::Afternoon => (12, 17),
            DayPart::Evening => (17, 20),
        }
    }
}

/// Preferred local start-time window. A point preference has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PreferredWindow {
    pub fn at(time: NaiveTime) -> Self {
        Self {
            start: time,
            end: time,
        }
    }

    /// Minutes between `local` and the nearest edge of the window around the clock face;
    /// zero inside it.
    pub fn distance_minutes(&self, local: NaiveTime) -> i64 {
        let (start, end) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };

        if (start..=end).contains(&local) {
            return 0;
        }
        clock_distance(local, start).min(clock_distance(local, end))
    }
}

fn clock_distance(a: NaiveTime, b: NaiveTime) -> i64 {
    const DAY_MINUTES: i64 = 24 * 60;
    let apart = (a - b).num_minutes().abs();
    apart.min(DAY_MINUTES - apart)
}

impl From<DayPart> for PreferredWindow {
    fn from(part: DayPart) -> Self {
        let (from, to) = part.hours();
        Self {
            start: NaiveTime::from_hms_opt(from, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(to, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}
