use std::time::Duration as StdDuration;

use chrono::Duration;

use super::availability::Buffer;
use super::scoring::ScoringWeights;

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 480;
/// Longest range `find_availability` will search.
pub const MAX_SEARCH_DAYS: i64 = 31;
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const MAX_RESULTS_CAP: usize = 20;

/// Tunables for the scheduling orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub slot_granularity_minutes: u32,
    pub buffer_minutes: u32,
    pub max_daily_interviews: u32,
    pub max_reschedules: u32,
    pub max_alternatives: usize,
    /// Applied to every collaborator call unless the request carries its own.
    pub upstream_timeout: StdDuration,
    pub weights: ScoringWeights,
    /// Distance from a preferred window at which preference factors reach zero.
    pub preference_tolerance_minutes: u32,
}

impl SchedulerSettings {
    pub fn granularity(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_granularity_minutes.max(1)))
    }

    pub fn buffer(&self) -> Buffer {
        Buffer::symmetric(i64::from(self.buffer_minutes))
    }

    pub(crate) fn timeout_for(&self, requested_ms: Option<u64>) -> StdDuration {
        requested_ms
            .map(StdDuration::from_millis)
            .unwrap_or(self.upstream_timeout)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: 15,
            buffer_minutes: 15,
            max_daily_interviews: 6,
            max_reschedules: 3,
            max_alternatives: 3,
            upstream_timeout: StdDuration::from_millis(2_000),
            weights: ScoringWeights::default(),
            preference_tolerance_minutes: 180,
        }
    }
}
