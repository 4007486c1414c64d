use crate::demo::{run_demo, run_slots, DemoArgs, SlotsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use interview_scheduler::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Interview Scheduler",
    about = "Run the interview scheduling service or explore it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print ranked open slots for a set of participants
    Slots(SlotsArgs),
    /// Walk through schedule, reschedule and cancel against the demo roster
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Busy-time CSV export (participant_id,start,end) to preload into the calendar
    #[arg(long)]
    pub(crate) calendar_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Slots(args) => run_slots(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
