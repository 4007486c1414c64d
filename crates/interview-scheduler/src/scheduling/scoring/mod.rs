//! Weighted multi-factor slot scoring.
//!
//! Each factor yields a value in `[0, 1]`; the total is the weighted sum scaled to
//! `[0, 100]`. Scoring is a pure function of the slot and the context snapshot.

mod factors;
mod weights;

pub use weights::{ScoringWeights, WeightsError};

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::domain::SchedulingPriority;
use super::interval::Interval;
use super::policy::{DayPart, PreferredWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    TimePreference,
    AvailabilityQuality,
    InterviewerWorkload,
    CandidateConvenience,
    Urgency,
}

impl ScoreFactor {
    pub fn ordered() -> [ScoreFactor; 5] {
        [
            ScoreFactor::TimePreference,
            ScoreFactor::AvailabilityQuality,
            ScoreFactor::InterviewerWorkload,
            ScoreFactor::CandidateConvenience,
            ScoreFactor::Urgency,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreFactor::TimePreference => "time_preference",
            ScoreFactor::AvailabilityQuality => "availability_quality",
            ScoreFactor::InterviewerWorkload => "interviewer_workload",
            ScoreFactor::CandidateConvenience => "candidate_convenience",
            ScoreFactor::Urgency => "urgency",
        }
    }
}

/// One factor's share of a slot score, kept for audit and API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotScore {
    pub total: f64,
    pub components: Vec<ScoreComponent>,
}

/// Everything a factor may look at besides the slot itself.
#[derive(Debug, Clone)]
pub struct SchedulingContext<'a> {
    pub now: DateTime<Utc>,
    pub preferred_time: Option<PreferredWindow>,
    /// Zone the preferred time is expressed in (the interviewer's).
    pub preference_timezone: Tz,
    pub preference_tolerance_minutes: u32,
    pub candidate_preference: Option<DayPart>,
    pub candidate_timezone: Tz,
    /// Shared free blocks, sorted and disjoint.
    pub free_blocks: &'a [Interval],
    pub interviewer_workload: u32,
    pub cohort_workloads: &'a [u32],
    pub deadline: Option<DateTime<Utc>>,
    pub priority: SchedulingPriority,
}

/// Stateless scorer applying configured weights to the factor set.
#[derive(Debug, Clone)]
pub struct SlotScorer {
    weights: ScoringWeights,
}

impl SlotScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(&self, slot: &Interval, context: &SchedulingContext<'_>) -> SlotScore {
        let components: Vec<ScoreComponent> = ScoreFactor::ordered()
            .into_iter()
            .map(|factor| {
                let result = match factor {
                    ScoreFactor::TimePreference => factors::time_preference(slot, context),
                    ScoreFactor::AvailabilityQuality => factors::availability_quality(slot, context),
                    ScoreFactor::InterviewerWorkload => factors::interviewer_workload(context),
                    ScoreFactor::CandidateConvenience => {
                        factors::candidate_convenience(slot, context)
                    }
                    ScoreFactor::Urgency => factors::urgency(slot, context),
                };
                let weight = self.weights.weight(factor);
                ScoreComponent {
                    factor,
                    value: result.value,
                    weight,
                    contribution: result.value * weight,
                    notes: result.notes,
                }
            })
            .collect();

        let total = components
            .iter()
            .map(|component| component.contribution)
            .sum::<f64>()
            * 100.0;

        SlotScore {
            total: total.clamp(0.0, 100.0),
            components,
        }
    }

    pub fn candidate(
        &self,
        slot: Interval,
        context: &SchedulingContext<'_>,
    ) -> SlotCandidate {
        let SlotScore { total, components } = self.score(&slot, context);
        SlotCandidate {
            interval: slot,
            score: total,
            breakdown: components,
            interviewer_workload: context.interviewer_workload,
        }
    }
}

/// A scored slot offered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub interval: Interval,
    pub score: f64,
    pub breakdown: Vec<ScoreComponent>,
    pub interviewer_workload: u32,
}

/// Highest score first; ties go to the earlier start, then the lighter interviewer.
pub fn rank(candidates: &mut [SlotCandidate]) {
    candidates.sort_by(compare);
}

fn compare(a: &SlotCandidate, b: &SlotCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.interval.start().cmp(&b.interval.start()))
        .then_with(|| a.interviewer_workload.cmp(&b.interviewer_workload))
}
