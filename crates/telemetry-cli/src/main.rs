//! Telemetry pipeline CLI
//!
//! Resolves the stage context from a `cdk.json`-style document and prints
//! it, checks it, or turns it into a deployment plan.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::ContextSource;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        verbose,
        context_file,
        overrides,
        command,
    } = Cli::parse();

    logging::init(verbose)
        .map_err(|e| CliError::user(format!("Failed to initialise logging: {}", e)))?;
    tracing::debug!("Verbose mode enabled");

    let source = ContextSource::new(context_file, overrides);
    match command {
        Some(cmd) => execute_command(&source, cmd),
        None => {
            println!("{} Telemetry pipeline CLI", "telemetry".green().bold());
            println!();
            println!("Run {} for available commands.", "telemetry --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(source: &ContextSource, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Resolve { json } => commands::run_resolve(source, json),
        Commands::Get { path, json } => commands::run_get(source, &path, json),
        Commands::Check { json } => commands::run_check(source, json),
        Commands::Plan { json } => commands::run_plan(source, json),
        Commands::Stacks => commands::run_stacks(source),
    }
}
