//! Remove command - stop tracking addresses

use anyhow::Result;
use cointrack_core::{LogEvent, RemoveOutcome};
use colored::Colorize;
use dialoguer::Confirm;

use super::{failure_event, get_context, get_logger, log_event, read_addresses, Credentials};

pub fn run(credentials: Credentials, addresses: Vec<String>, force: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    let addresses = read_addresses(addresses)?;
    let ctx = get_context()?;
    let password = credentials.password()?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Stop tracking {} address(es) and delete their history?",
                addresses.len()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let results = ctx
        .account_service
        .remove_addresses(&credentials.user, &password, &addresses)?;

    let removed = results
        .iter()
        .filter(|r| r.data.as_ref().map(|o| o.is_removed()).unwrap_or(false))
        .count();
    let failed = results.iter().filter(|r| !r.success).count();
    log_event(&logger, LogEvent::new("addresses_removed").with_count(removed as u64));
    if let Some(event) = failure_event("remove", failed, results.len()) {
        log_event(&logger, event);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (address, result) in addresses.iter().zip(&results) {
            match (&result.data, &result.error) {
                (Some(RemoveOutcome::Removed { transactions }), _) => println!(
                    "{} {} ({} transaction(s) deleted)",
                    "Removed:".green(),
                    address,
                    transactions
                ),
                (Some(RemoveOutcome::NotTracked), _) => {
                    println!("{} {}", "Not tracked:".yellow(), address)
                }
                (None, error) => println!(
                    "{} {} - {}",
                    "Error:".red(),
                    address,
                    error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} address(es) failed", failed);
    }
    Ok(())
}
