//! Add command - start tracking addresses

use anyhow::Result;
use cointrack_core::{AddOutcome, LogEvent};
use colored::Colorize;

use super::{failure_event, get_context, get_logger, log_event, read_addresses, Credentials};
use crate::output;

pub fn run(credentials: Credentials, addresses: Vec<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    let addresses = read_addresses(addresses)?;
    let ctx = get_context()?;
    let password = credentials.password()?;

    let spinner = (!json).then(|| output::spinner("Fetching address history..."));
    let results = ctx
        .account_service
        .add_addresses(&credentials.user, &password, &addresses)?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let added = results
        .iter()
        .filter(|r| r.data.as_ref().map(|o| o.is_added()).unwrap_or(false))
        .count();
    let failed = results.iter().filter(|r| !r.success).count();

    log_event(
        &logger,
        LogEvent::new("addresses_added")
            .with_provider(ctx.sync_service.provider_name())
            .with_count(added as u64),
    );
    if let Some(event) = failure_event("add", failed, results.len()) {
        log_event(&logger, event);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (address, result) in addresses.iter().zip(&results) {
            match (&result.data, &result.error) {
                (Some(AddOutcome::Added { balance, transactions }), _) => println!(
                    "{} {} ({}, {} transaction(s))",
                    "Added:".green(),
                    address,
                    output::format_btc(*balance),
                    transactions
                ),
                (Some(AddOutcome::AlreadyTracked), _) => {
                    println!("{} {}", "Already tracked:".yellow(), address)
                }
                (None, error) => println!(
                    "{} {} - {}",
                    "Error:".red(),
                    address,
                    error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
        println!();
        println!("{} of {} address(es) added", added, addresses.len());
    }

    if failed > 0 {
        anyhow::bail!("{} address(es) failed", failed);
    }
    Ok(())
}
