//! Cointrack CLI - track bitcoin addresses from your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, add, doctor, info, logs, remove, resync, update, Credentials};

/// Cointrack - incremental bitcoin address tracking
#[derive(Parser)]
#[command(name = "ct", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Start tracking addresses (reads stdin when none are given)
    Add {
        #[command(flatten)]
        credentials: Credentials,
        /// Addresses to track
        addresses: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stop tracking addresses and delete their history
    Remove {
        #[command(flatten)]
        credentials: Credentials,
        /// Addresses to untrack
        addresses: Vec<String>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show stored balances (no network access)
    Info {
        #[command(flatten)]
        credentials: Credentials,
        /// List transactions per address
        #[arg(long, short)]
        transactions: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch new transactions for every tracked address
    Update {
        #[command(flatten)]
        credentials: Credentials,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild one address history from scratch
    Resync {
        #[command(flatten)]
        credentials: Credentials,
        /// Address to resync
        address: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Account { .. } => "account",
            Commands::Add { .. } => "add",
            Commands::Remove { .. } => "remove",
            Commands::Info { .. } => "info",
            Commands::Update { .. } => "update",
            Commands::Resync { .. } => "resync",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();

    if let Some(logger) = commands::get_logger() {
        let _ = logger.log_command(command);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Account { command } => account::run(command),
        Commands::Add { credentials, addresses, json } => add::run(credentials, addresses, json),
        Commands::Remove { credentials, addresses, force, json } => {
            remove::run(credentials, addresses, force, json)
        }
        Commands::Info { credentials, transactions, json } => {
            info::run(credentials, transactions, json)
        }
        Commands::Update { credentials, json } => update::run(credentials, json),
        Commands::Resync { credentials, address, json } => resync::run(credentials, address, json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
    }
}
