//! CLI command implementations

pub mod account;
pub mod add;
pub mod doctor;
pub mod info;
pub mod logs;
pub mod remove;
pub mod resync;
pub mod update;

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cointrack_core::{CointrackContext, EntryPoint, LogEvent, LoggingService};
use dialoguer::Password;

/// Credentials shared by every account-scoped command
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Account username
    #[arg(short, long, env = "COINTRACK_USER")]
    pub user: String,
    /// Account password (prompted for when omitted)
    #[arg(short, long, env = "COINTRACK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Credentials {
    /// Password from --password / COINTRACK_PASSWORD, or an interactive prompt
    pub fn password(&self) -> Result<String> {
        if let Some(p) = &self.password {
            return Ok(p.clone());
        }
        let p = Password::new()
            .with_prompt(format!("Password for {}", self.user))
            .interact()?;
        Ok(p)
    }
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_cointrack_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// `sync_failed` error event for a command where `failed` of `total`
/// addresses failed, or None when nothing failed
///
/// Error text can carry address keys, so only counts reach the log.
pub fn failure_event(command: &str, failed: usize, total: usize) -> Option<LogEvent> {
    (failed > 0).then(|| {
        LogEvent::new("sync_failed")
            .with_command(command)
            .with_count(failed as u64)
            .with_error(format!("{} of {} address(es) failed", failed, total))
    })
}

/// Get the data directory from COINTRACK_DIR or default to ~/.cointrack
pub fn get_cointrack_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("COINTRACK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::home_dir()
        .context("Could not find home directory")?
        .join(".cointrack"))
}

/// Get or create cointrack context
pub fn get_context() -> Result<CointrackContext> {
    let data_dir = get_cointrack_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create cointrack directory: {:?}", data_dir))?;

    CointrackContext::new(&data_dir).context("Failed to initialize cointrack context")
}

/// Addresses from arguments, or from stdin (newline or comma separated)
/// when none are given and stdin is piped
pub fn read_addresses(args: Vec<String>) -> Result<Vec<String>> {
    let addresses = if args.is_empty() && atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        split_addresses(&buffer)
    } else {
        args
    };

    if addresses.is_empty() {
        anyhow::bail!("No addresses provided. Pass them as arguments or pipe them from stdin.");
    }
    Ok(addresses)
}

fn split_addresses(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == '\n' || c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
