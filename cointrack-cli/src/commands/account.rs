//! Account command - create accounts

use anyhow::Result;
use clap::Subcommand;
use cointrack_core::LogEvent;
use dialoguer::Password;

use super::{get_context, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Username (letters, digits, '_', '.', '-')
        username: String,
        /// Password (prompted for with confirmation when omitted)
        #[arg(short, long, env = "COINTRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn password_with_confirm(password_flag: Option<String>) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    let p1 = Password::new().with_prompt("Choose a password").interact()?;
    let p2 = Password::new().with_prompt("Confirm password").interact()?;

    if p1 != p2 {
        anyhow::bail!("Passwords do not match");
    }
    Ok(p1)
}

pub fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Create {
            username,
            password,
            json,
        } => {
            let logger = get_logger();
            let ctx = get_context()?;
            let password = password_with_confirm(password)?;

            let account = ctx.account_service.create_account(&username, &password)?;
            log_event(&logger, LogEvent::new("account_created").with_command("account create"));

            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                output::success(&format!("Account created: {}", account.username));
            }
        }
    }

    Ok(())
}
