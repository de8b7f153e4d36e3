pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "banter",
    about = "Banter operator CLI",
    long_about = "Inspect configuration, check runtime readiness, replay demo conversations \
                  offline, and report per-chat engagement statistics.",
    after_help = "Examples:\n  banter doctor --json\n  banter config\n  banter simulate --seed 7\n  banter stats --chat-id -1001234567890"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Replay a canned demo conversation through a fully offline gate")]
    Simulate {
        #[arg(long, default_value_t = 7, help = "Seed for the rule-based classifier")]
        seed: u64,
    },
    #[command(about = "Report recorded engagement statistics for one chat")]
    Stats {
        #[arg(long, help = "Chat identity to report on")]
        chat_id: String,
        #[arg(long, default_value_t = 100, help = "How many recent interactions to aggregate")]
        limit: i64,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Simulate { seed } => commands::simulate::run(seed),
        Command::Stats { chat_id, limit } => commands::stats::run(&chat_id, limit),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
