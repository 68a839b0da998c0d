//! CLI argument parsing for the outreach campaign commands.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "outreach",
    version,
    about = "Outreach campaign runner: send, remind and thank contacts from a roster sheet",
    after_help = "Commands:\n  init                 Write a campaign.json stub\n  validate             Report invalid, missing, suspicious and duplicate addresses\n  status               Count contacts per lifecycle stage\n  send                 Send the initial solicitation to unsent contacts\n  remind               Remind contacts who have not responded\n  thank                Thank everyone in the response log\n  check-transport      Verify transport credentials without sending\n\nExamples:\n  outreach init\n  outreach validate --check-dns\n  outreach send --size 25 --dry-run\n  outreach remind\n  outreach status --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Campaign config file (defaults to ./campaign.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug diagnostics to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Validate(ValidateArgs),
    Status(StatusArgs),
    Send(SendArgs),
    Remind(RemindArgs),
    Thank(ThankArgs),
    CheckTransport(CheckTransportArgs),
}

/// Batch controls shared by every sending command.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Process at most N candidates this run
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    size: Option<u64>,

    /// Classify and count without sending or updating the sheet
    #[arg(long)]
    pub dry_run: bool,
}

impl BatchArgs {
    pub fn size(&self) -> Option<usize> {
        self.size.map(|size| usize::try_from(size).unwrap_or(usize::MAX))
    }
}

#[derive(Parser, Debug)]
#[command(about = "Send the initial solicitation to contacts with an empty status")]
pub struct SendArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Send reminders to contacts who were sent but have not responded")]
pub struct RemindArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Send thank-you messages to contacts in the response log")]
pub struct ThankArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Validate every roster address and print a report")]
pub struct ValidateArgs {
    /// Resolve each domain through DNS (slower)
    #[arg(long)]
    pub check_dns: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Summarize campaign progress per lifecycle stage")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Verify transport credentials without sending anything")]
pub struct CheckTransportArgs {}

#[derive(Parser, Debug)]
#[command(about = "Write a campaign config stub")]
pub struct InitArgs {
    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}
