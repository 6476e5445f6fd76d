mod args;
mod commands;
mod shared;

use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

use args::{AppCommand, Cli};
use commands::{run_monitor, run_replay};

// Top-level entrypoint: set up logging, parse CLI args and dispatch to a command module.
fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        AppCommand::Monitor(args) => run_monitor(args),
        AppCommand::Replay(args) => run_replay(args),
    }
}
