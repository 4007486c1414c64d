use crate::infra::{build_scheduler, next_business_day, parse_date, parse_instant};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use interview_scheduler::config::AppConfig;
use interview_scheduler::error::AppError;
use interview_scheduler::scheduling::{
    AvailabilityRequest, CancelRequest, InterviewScheduler, InterviewType, Interval, JobId,
    ParticipantId, PreferredWindow, RescheduleRequest, ScheduleOutcome, ScheduleRequest,
    SchedulingError, SchedulingPriority, SlotCandidate,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Day to book on (YYYY-MM-DD). Defaults to the next business day.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Busy-time CSV export to preload before booking
    #[arg(long)]
    pub(crate) calendar_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SlotsArgs {
    /// Participant to include (repeat for each participant)
    #[arg(long = "participant", required = true)]
    pub(crate) participants: Vec<String>,
    /// Search range start (RFC 3339). Defaults to the next business day, 00:00 UTC.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) from: Option<DateTime<Utc>>,
    /// Search range end (RFC 3339). Defaults to one day after the start.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) to: Option<DateTime<Utc>>,
    /// Interview length in minutes
    #[arg(long, default_value_t = 60)]
    pub(crate) duration: u32,
    /// Number of ranked slots to print
    #[arg(long, default_value_t = 5)]
    pub(crate) max_results: usize,
    /// Busy-time CSV export to preload before searching
    #[arg(long)]
    pub(crate) calendar_csv: Option<PathBuf>,
}

pub(crate) async fn run_slots(args: SlotsArgs) -> Result<(), AppError> {
    let SlotsArgs {
        participants,
        from,
        to,
        duration,
        max_results,
        calendar_csv,
    } = args;

    let settings = AppConfig::load()?.scheduler.settings();
    let scheduler = build_scheduler(settings, calendar_csv.as_deref())?;

    let start = from.unwrap_or_else(|| midnight(next_business_day(Utc::now().date_naive())));
    let end = to.unwrap_or(start + Duration::days(1));
    let range = Interval::new(start, end).map_err(SchedulingError::from)?;

    let slots = scheduler
        .find_availability(AvailabilityRequest {
            participant_ids: participants.into_iter().map(ParticipantId).collect(),
            range,
            duration_minutes: duration,
            job_id: None,
            priority: SchedulingPriority::Medium,
            preferred_time: None,
            max_results: Some(max_results),
            timeout_ms: None,
        })
        .await?;

    println!(
        "Open {duration}-minute slots between {} and {}",
        range.start().to_rfc3339(),
        range.end().to_rfc3339()
    );
    if slots.is_empty() {
        println!("- none");
    }
    for (rank, slot) in slots.iter().enumerate() {
        render_slot(rank + 1, slot);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let settings = AppConfig::load()?.scheduler.settings();
    let scheduler = build_scheduler(settings, args.calendar_csv.as_deref())?;

    let day = args
        .date
        .unwrap_or_else(|| next_business_day(Utc::now().date_naive()));
    let window = Interval::new(midnight(day), midnight(day) + Duration::days(1))
        .map_err(SchedulingError::from)?;

    println!("Interview scheduling demo for {day}");

    println!("\n1. Technical interview, Jordan Lee (New York) with Riley Chen (Chicago)");
    let first = scheduler
        .schedule(ScheduleRequest {
            candidate_id: ParticipantId("cand-100".to_string()),
            job_id: JobId("job-backend".to_string()),
            interviewer_id: ParticipantId("lee@example.com".to_string()),
            window,
            duration_minutes: 60,
            interval: None,
            force: false,
            interview_type: InterviewType::Technical,
            location: "Video call".to_string(),
            notes: None,
            priority: SchedulingPriority::High,
            preferred_time: NaiveTime::from_hms_opt(10, 0, 0).map(PreferredWindow::at),
            timeout_ms: None,
        })
        .await;
    let first = render_outcome(first);

    println!("\n2. Behavioral interview, Sam Kim (London) with Morgan Patel (Berlin)");
    let second = scheduler
        .schedule(ScheduleRequest {
            candidate_id: ParticipantId("cand-101".to_string()),
            job_id: JobId("job-sre".to_string()),
            interviewer_id: ParticipantId("kim@example.com".to_string()),
            window,
            duration_minutes: 45,
            interval: None,
            force: false,
            interview_type: InterviewType::Behavioral,
            location: "London office".to_string(),
            notes: Some("Bring the incident review deck".to_string()),
            priority: SchedulingPriority::Medium,
            preferred_time: None,
            timeout_ms: None,
        })
        .await;
    let second = render_outcome(second);

    if let Some(ScheduleOutcome::Confirmed {
        interview,
        alternatives,
        ..
    }) = &first
    {
        if let Some(next_best) = alternatives.first() {
            println!("\n3. Moving {} to its runner-up slot", interview.id);
            match scheduler
                .reschedule(
                    &interview.id,
                    RescheduleRequest {
                        new_interval: next_best.interval,
                        reason: "interviewer travel".to_string(),
                        force: false,
                        timeout_ms: None,
                    },
                )
                .await
            {
                Ok(moved) => println!(
                    "- now {} -> {} (reschedule #{})",
                    moved.interval.start().to_rfc3339(),
                    moved.interval.end().to_rfc3339(),
                    moved.reschedule_count
                ),
                Err(err) => println!("- reschedule rejected: {err}"),
            }
        }
    }

    if let Some(interview) = second.as_ref().and_then(ScheduleOutcome::interview) {
        println!("\n4. Cancelling {}", interview.id);
        let request = CancelRequest {
            reason: "candidate accepted another offer".to_string(),
        };
        match scheduler.cancel(&interview.id, request).await {
            Ok(cancelled) => println!("- status {}", cancelled.status),
            Err(err) => println!("- cancel rejected: {err}"),
        }
    }

    render_log(&scheduler)?;
    Ok(())
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

fn render_outcome(
    outcome: Result<ScheduleOutcome, SchedulingError>,
) -> Option<ScheduleOutcome> {
    match outcome {
        Ok(outcome @ ScheduleOutcome::Confirmed { .. }) => {
            if let ScheduleOutcome::Confirmed {
                interview,
                chosen,
                alternatives,
            } = &outcome
            {
                println!(
                    "- booked {} at {} ({})",
                    interview.id,
                    interview.interval.start().to_rfc3339(),
                    interview.title()
                );
                render_slot(1, chosen);
                for (rank, alternative) in alternatives.iter().enumerate() {
                    render_slot(rank + 2, alternative);
                }
            }
            Some(outcome)
        }
        Ok(ScheduleOutcome::NoAvailability { slots_evaluated }) => {
            println!("- no slot fits ({slots_evaluated} evaluated)");
            None
        }
        Err(err) => {
            let hint = if err.is_retryable() { " (retryable)" } else { "" };
            println!("- rejected: {err}{hint}");
            None
        }
    }
}

fn render_slot(rank: usize, slot: &SlotCandidate) {
    println!(
        "  #{rank} {} score {:.1}",
        slot.interval.start().to_rfc3339(),
        slot.score
    );
    for component in &slot.breakdown {
        println!(
            "      {:<22} {:.2} x {:.2} ({})",
            component.factor.label(),
            component.value,
            component.weight,
            component.notes
        );
    }
}

fn render_log(scheduler: &InterviewScheduler) -> Result<(), AppError> {
    println!("\nScheduling log");
    for entry in scheduler.log_entries()? {
        println!(
            "- #{} {:?} {:?}: {}",
            entry.sequence, entry.action, entry.outcome, entry.reason
        );
    }

    let summary = scheduler.analytics(None)?;
    println!(
        "\n{} decisions | {:.0}% schedule success | {} reschedules | {} cancellations",
        summary.total_decisions,
        summary.success_rate * 100.0,
        summary.reschedules,
        summary.cancellations
    );
    if let Some(score) = summary.average_best_score {
        println!("Average winning score {score:.1}");
    }
    Ok(())
}
