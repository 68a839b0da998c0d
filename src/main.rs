use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod email;
mod error;
mod google;
mod message;
mod reconcile;
mod report;
mod responses;
mod roster;
mod runner;
mod store;
mod templates;
mod transport;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let config_path = args.config.clone();
    let resolve_config = || config_path.clone().unwrap_or_else(config::default_config_path);

    match args.command {
        Command::Init(init) => {
            let path = config_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
            workflow::run_init(&path, &init)
        }
        Command::Validate(validate) => workflow::run_validate(&resolve_config(), &validate),
        Command::Status(status) => workflow::run_status(&resolve_config(), &status),
        Command::Send(send) => workflow::run_send(&resolve_config(), &send),
        Command::Remind(remind) => workflow::run_remind(&resolve_config(), &remind.batch),
        Command::Thank(thank) => workflow::run_thank(&resolve_config(), &thank.batch),
        Command::CheckTransport(_) => workflow::run_check_transport(&resolve_config()),
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
