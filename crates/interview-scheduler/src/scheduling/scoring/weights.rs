use serde::{Deserialize, Serialize};

use super::ScoreFactor;

const SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("weight for {factor:?} must be a finite, non-negative number (got {value})")]
    InvalidWeight { factor: ScoreFactor, value: f64 },
    #[error("scoring weights must sum to 1.0 (got {0:.6})")]
    InvalidSum(f64),
}

/// Per-factor weights for slot ranking. Validated to sum to 1.0 at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct ScoringWeights {
    time_preference: f64,
    availability_quality: f64,
    interviewer_workload: f64,
    candidate_convenience: f64,
    urgency: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    time_preference: f64,
    availability_quality: f64,
    interviewer_workload: f64,
    candidate_convenience: f64,
    urgency: f64,
}

impl TryFrom<RawWeights> for ScoringWeights {
    type Error = WeightsError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        ScoringWeights::new(
            raw.time_preference,
            raw.availability_quality,
            raw.interviewer_workload,
            raw.candidate_convenience,
            raw.urgency,
        )
    }
}

impl ScoringWeights {
    pub fn new(
        time_preference: f64,
        availability_quality: f64,
        interviewer_workload: f64,
        candidate_convenience: f64,
        urgency: f64,
    ) -> Result<Self, WeightsError> {
        let weights = Self {
            time_preference,
            availability_quality,
            interviewer_workload,
            candidate_convenience,
            urgency,
        };

        for factor in ScoreFactor::ordered() {
            let value = weights.weight(factor);
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidWeight { factor, value });
            }
        }

        let sum: f64 = ScoreFactor::ordered()
            .iter()
            .map(|factor| weights.weight(*factor))
            .sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(WeightsError::InvalidSum(sum));
        }

        Ok(weights)
    }

    pub fn weight(&self, factor: ScoreFactor) -> f64 {
        match factor {
            ScoreFactor::TimePreference => self.time_preference,
            ScoreFactor::AvailabilityQuality => self.availability_quality,
            ScoreFactor::InterviewerWorkload => self.interviewer_workload,
            ScoreFactor::CandidateConvenience => self.candidate_convenience,
            ScoreFactor::Urgency => self.urgency,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            time_preference: 0.30,
            availability_quality: 0.25,
            interviewer_workload: 0.20,
            candidate_convenience: 0.15,
            urgency: 0.10,
        }
    }
}
