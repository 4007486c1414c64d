use chrono::{Duration, Timelike};

use super::super::availability::containing_block;
use super::super::interval::Interval;
use super::super::policy::PreferredWindow;
use super::SchedulingContext;

/// Free block at least this many times the slot length earns full availability credit.
const SLACK_TARGET_RATIO: f64 = 4.0;
/// Deadlines further out than this exert no urgency pressure.
const URGENCY_HORIZON_HOURS: f64 = 30.0 * 24.0;

pub(crate) struct FactorScore {
    pub value: f64,
    pub notes: String,
}

impl FactorScore {
    fn new(value: f64, notes: impl Into<String>) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            notes: notes.into(),
        }
    }
}

/// Linear decay from 1.0 at the window edge to 0.0 at `tolerance_minutes` away.
fn decay(window: &PreferredWindow, local: chrono::NaiveTime, tolerance_minutes: u32) -> (f64, i64) {
    let distance = window.distance_minutes(local);
    if tolerance_minutes == 0 {
        return (if distance == 0 { 1.0 } else { 0.0 }, distance);
    }
    let value = 1.0 - distance as f64 / f64::from(tolerance_minutes);
    (value, distance)
}

pub(crate) fn time_preference(slot: &Interval, context: &SchedulingContext<'_>) -> FactorScore {
    let Some(window) = context.preferred_time else {
        return FactorScore::new(0.5, "no preferred time stated");
    };

    let local = slot.start().with_timezone(&context.preference_timezone).time();
    let (value, distance) = decay(&window, local, context.preference_tolerance_minutes);
    if distance == 0 {
        FactorScore::new(value, "start within preferred window")
    } else {
        FactorScore::new(value, format!("start {distance} minutes from preferred window"))
    }
}

pub(crate) fn availability_quality(slot: &Interval, context: &SchedulingContext<'_>) -> FactorScore {
    let Some(block) = containing_block(context.free_blocks, slot) else {
        return FactorScore::new(0.0, "slot is outside shared free time");
    };

    let requested = slot.duration().num_seconds().max(1) as f64;
    let ratio = block.duration().num_seconds() as f64 / requested;
    let value = (ratio - 1.0) / (SLACK_TARGET_RATIO - 1.0);
    FactorScore::new(
        value,
        format!("free block of {} minutes", block.duration().num_minutes()),
    )
}

pub(crate) fn interviewer_workload(context: &SchedulingContext<'_>) -> FactorScore {
    let workload = context.interviewer_workload;
    let min = context
        .cohort_workloads
        .iter()
        .copied()
        .chain(std::iter::once(workload))
        .min()
        .unwrap_or(workload);
    let max = context
        .cohort_workloads
        .iter()
        .copied()
        .chain(std::iter::once(workload))
        .max()
        .unwrap_or(workload);

    if max == min {
        return FactorScore::new(1.0, format!("{workload} active interviews, cohort balanced"));
    }

    let value = 1.0 - f64::from(workload - min) / f64::from(max - min);
    FactorScore::new(
        value,
        format!("{workload} active interviews (cohort range {min}-{max})"),
    )
}

pub(crate) fn candidate_convenience(slot: &Interval, context: &SchedulingContext<'_>) -> FactorScore {
    let local = slot.start().with_timezone(&context.candidate_timezone).time();

    if let Some(part) = context.candidate_preference {
        let window = PreferredWindow::from(part);
        let (value, distance) = decay(&window, local, context.preference_tolerance_minutes);
        return if distance == 0 {
            FactorScore::new(value, format!("matches candidate {} preference", part.label()))
        } else {
            FactorScore::new(
                value,
                format!("{distance} minutes outside candidate {} preference", part.label()),
            )
        };
    }

    let hour = local.hour();
    if (9..17).contains(&hour) {
        FactorScore::new(1.0, "business hours for candidate")
    } else if (8..18).contains(&hour) {
        FactorScore::new(0.8, "edge of candidate business hours")
    } else {
        FactorScore::new(0.4, "outside candidate business hours")
    }
}

/// Pressure grows as the fill deadline approaches; earlier slots keep more of it.
pub(crate) fn urgency(slot: &Interval, context: &SchedulingContext<'_>) -> FactorScore {
    let horizon = Duration::hours(URGENCY_HORIZON_HOURS as i64);

    let (pressure, source) = match context.deadline {
        Some(deadline) => {
            let remaining = hours(deadline - context.now);
            let pressure = 1.0 - (remaining / URGENCY_HORIZON_HOURS).clamp(0.0, 1.0);
            (pressure, "fill deadline")
        }
        None => (context.priority.pressure(), "priority"),
    };

    let lead = hours(slot.start() - context.now).max(0.0);
    let timeliness = 1.0 - (lead / hours(horizon)).clamp(0.0, 1.0);
    let past_deadline = context
        .deadline
        .map(|deadline| slot.start() >= deadline)
        .unwrap_or(false);
    let timeliness = if past_deadline { 0.0 } else { timeliness };

    let value = pressure * (0.5 + 0.5 * timeliness);
    FactorScore::new(
        value,
        format!("{source} pressure {pressure:.2}, slot in {lead:.0}h"),
    )
}

fn hours(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 3600.0
}
