//! Resync command - rebuild one address history from scratch

use anyhow::Result;
use cointrack_core::LogEvent;

use super::{failure_event, get_context, get_logger, log_event, Credentials};
use crate::output;

pub fn run(credentials: Credentials, address: String, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let password = credentials.password()?;

    let spinner = (!json).then(|| output::spinner("Refetching full history..."));
    let result = ctx
        .account_service
        .resync_address(&credentials.user, &password, &address);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(event) = failure_event("resync", 1, 1) {
                log_event(&logger, event);
            }
            return Err(e.into());
        }
    };

    log_event(
        &logger,
        LogEvent::new("address_resynced")
            .with_provider(ctx.sync_service.provider_name())
            .with_count(outcome.transactions_after),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::success(&format!("Resynced {}", address));
        println!(
            "  Transactions: {} -> {}",
            outcome.transactions_before, outcome.transactions_after
        );
        println!("  Balance: {}", output::format_btc(outcome.balance));
    }

    Ok(())
}
