//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Telemetry pipeline - resolve deployment context and plan the stacks
#[derive(Parser, Debug)]
#[command(name = "telemetry")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Context document (JSON, TOML or YAML)
    #[arg(
        short = 'f',
        long,
        global = true,
        default_value = "cdk.json",
        env = "TELEMETRY_CONTEXT_FILE"
    )]
    pub context_file: PathBuf,

    /// Context override, e.g. `-c stage=prod` (repeatable)
    #[arg(short = 'c', long = "context", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the merged context for the selected stage
    Resolve {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print one value of the merged context
    ///
    /// Examples:
    ///   telemetry get aws_region
    ///   telemetry get queue.kinesis_shard_count
    ///   telemetry get outbound.services.pull.processor --json
    Get {
        /// Dotted path into the merged context
        path: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Report overridden shared values and validate the context
    Check {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print the deployment plan
    Plan {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List stack ids in declaration order
    Stacks,
}
