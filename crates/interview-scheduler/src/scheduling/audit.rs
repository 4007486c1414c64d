//! Append-only scheduling decision log.
//!
//! Diagnostic only: conflict checks always go to persistence, never to this log.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::InterviewId;
use super::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingAction {
    Schedule,
    Reschedule,
    Cancel,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Committed,
    Rejected,
    #[serde(rename = "no_slots")]
    NoAvailability,
    Failed,
}

/// Decision as the orchestrator describes it, before the log stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntryDraft {
    pub at: DateTime<Utc>,
    pub action: SchedulingAction,
    pub interview_id: Option<InterviewId>,
    pub request_summary: String,
    pub chosen_slot: Option<Interval>,
    pub previous_slot: Option<Interval>,
    pub outcome: DecisionOutcome,
    pub reason: String,
    pub slots_evaluated: usize,
    pub best_score: Option<f64>,
    pub processing_time_ms: u64,
    /// Sequence of an earlier entry this one reverses.
    pub compensates: Option<u64>,
}

impl LogEntryDraft {
    pub fn new(
        at: DateTime<Utc>,
        action: SchedulingAction,
        request_summary: impl Into<String>,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            at,
            action,
            interview_id: None,
            request_summary: request_summary.into(),
            chosen_slot: None,
            previous_slot: None,
            outcome,
            reason: reason.into(),
            slots_evaluated: 0,
            best_score: None,
            processing_time_ms: 0,
            compensates: None,
        }
    }
}

/// Immutable, sequenced log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingLogEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub action: SchedulingAction,
    pub interview_id: Option<InterviewId>,
    pub request_summary: String,
    pub chosen_slot: Option<Interval>,
    pub previous_slot: Option<Interval>,
    pub outcome: DecisionOutcome,
    pub reason: String,
    pub slots_evaluated: usize,
    pub best_score: Option<f64>,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensates: Option<u64>,
}

impl SchedulingLogEntry {
    fn is_compensation(&self) -> bool {
        self.compensates.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("scheduling log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink. Entries come back in sequence order with non-decreasing timestamps.
pub trait SchedulingLog: Send + Sync {
    fn append(&self, draft: LogEntryDraft) -> Result<SchedulingLogEntry, AuditError>;
    fn entries(&self) -> Result<Vec<SchedulingLogEntry>, AuditError>;
}

/// Process-local log; the default sink for the service and tests.
#[derive(Debug, Default)]
pub struct MemorySchedulingLog {
    entries: Mutex<Vec<SchedulingLogEntry>>,
}

impl MemorySchedulingLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulingLog for MemorySchedulingLog {
    fn append(&self, draft: LogEntryDraft) -> Result<SchedulingLogEntry, AuditError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AuditError::Unavailable("log mutex poisoned".to_string()))?;

        let (sequence, timestamp) = match entries.last() {
            Some(last) => (last.sequence + 1, draft.at.max(last.timestamp)),
            None => (1, draft.at),
        };

        let entry = SchedulingLogEntry {
            sequence,
            timestamp,
            action: draft.action,
            interview_id: draft.interview_id,
            request_summary: draft.request_summary,
            chosen_slot: draft.chosen_slot,
            previous_slot: draft.previous_slot,
            outcome: draft.outcome,
            reason: draft.reason,
            slots_evaluated: draft.slots_evaluated,
            best_score: draft.best_score,
            processing_time_ms: draft.processing_time_ms,
            compensates: draft.compensates,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<SchedulingLogEntry>, AuditError> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| AuditError::Unavailable("log mutex poisoned".to_string()))
    }
}

/// Aggregates over scheduling decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulingAnalytics {
    pub total_decisions: usize,
    pub schedules_committed: usize,
    pub schedules_failed: usize,
    pub reschedules: usize,
    pub cancellations: usize,
    pub completions: usize,
    /// Committed schedules over schedule attempts, in `[0, 1]`.
    pub success_rate: f64,
    pub average_processing_time_ms: f64,
    pub average_slots_evaluated: f64,
    pub average_best_score: Option<f64>,
}

/// Summarise entries, optionally restricted to those stamped inside `range`.
///
/// A compensated commit counts as one failed decision; the compensating entry itself is
/// not a separate decision.
pub fn analytics(entries: &[SchedulingLogEntry], range: Option<&Interval>) -> SchedulingAnalytics {
    let reversed: HashSet<u64> = entries.iter().filter_map(|entry| entry.compensates).collect();
    let held = |entry: &SchedulingLogEntry| {
        entry.outcome == DecisionOutcome::Committed && !reversed.contains(&entry.sequence)
    };

    let selected: Vec<&SchedulingLogEntry> = entries
        .iter()
        .filter(|entry| !entry.is_compensation())
        .filter(|entry| match range {
            Some(range) => range.start() <= entry.timestamp && entry.timestamp < range.end(),
            None => true,
        })
        .collect();

    let committed = |action: SchedulingAction| {
        selected
            .iter()
            .filter(|entry| entry.action == action && held(entry))
            .count()
    };

    let schedule_entries: Vec<&&SchedulingLogEntry> = selected
        .iter()
        .filter(|entry| entry.action == SchedulingAction::Schedule)
        .collect();
    let schedules_committed = committed(SchedulingAction::Schedule);
    let schedules_failed = schedule_entries.len() - schedules_committed;

    let success_rate = if schedule_entries.is_empty() {
        0.0
    } else {
        schedules_committed as f64 / schedule_entries.len() as f64
    };

    let average_processing_time_ms = mean(selected.iter().map(|e| e.processing_time_ms as f64))
        .unwrap_or(0.0);
    let average_slots_evaluated =
        mean(schedule_entries.iter().map(|e| e.slots_evaluated as f64)).unwrap_or(0.0);
    let average_best_score = mean(
        selected
            .iter()
            .filter(|entry| held(entry))
            .filter_map(|entry| entry.best_score),
    );

    SchedulingAnalytics {
        total_decisions: selected.len(),
        schedules_committed,
        schedules_failed,
        reschedules: committed(SchedulingAction::Reschedule),
        cancellations: committed(SchedulingAction::Cancel),
        completions: committed(SchedulingAction::Complete),
        success_rate,
        average_processing_time_ms,
        average_slots_evaluated,
        average_best_score,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
