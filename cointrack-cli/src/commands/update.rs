//! Update command - incremental refresh of every tracked address

use anyhow::Result;
use cointrack_core::{LogEvent, RefreshOutcome};
use colored::Colorize;

use super::{failure_event, get_context, get_logger, log_event, Credentials};
use crate::output;

pub fn run(credentials: Credentials, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let password = credentials.password()?;

    let spinner = (!json).then(|| output::spinner("Refreshing tracked addresses..."));
    let results = ctx
        .account_service
        .update_account(&credentials.user, &password)?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let updated = results
        .iter()
        .filter(|r| r.data.as_ref().map(|o| o.is_updated()).unwrap_or(false))
        .count();
    let drifted = results
        .iter()
        .filter(|r| r.data.as_ref().map(|o| o.has_drift()).unwrap_or(false))
        .count();
    let failed = results.iter().filter(|r| !r.success).count();

    log_event(
        &logger,
        LogEvent::new("account_updated")
            .with_provider(ctx.sync_service.provider_name())
            .with_count(updated as u64),
    );
    if let Some(event) = failure_event("update", failed, results.len()) {
        log_event(&logger, event);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        output::info("No addresses tracked.");
    } else {
        for result in &results {
            let address = result
                .context
                .as_ref()
                .and_then(|c| c.get("address"))
                .and_then(|v| v.as_str())
                .unwrap_or("?");

            match (&result.data, &result.error) {
                (Some(RefreshOutcome::NoChange), _) => {
                    println!("{} {}", "Up to date:".dimmed(), address)
                }
                (
                    Some(RefreshOutcome::Updated {
                        new_transactions,
                        skipped,
                        balance,
                    }),
                    _,
                ) => println!(
                    "{} {} ({} new, {} already stored, balance {})",
                    "Updated:".green(),
                    address,
                    new_transactions - skipped,
                    skipped,
                    output::format_btc(*balance)
                ),
                (None, error) => println!(
                    "{} {} - {}",
                    "Error:".red(),
                    address,
                    error.as_deref().unwrap_or("unknown error")
                ),
            }
        }

        if drifted > 0 {
            println!();
            output::warning(&format!(
                "{} address(es) returned transactions already stored. Upstream ordering \
                 changed; run `ct resync <address>` to rebuild their history.",
                drifted
            ));
        }
    }

    if failed > 0 {
        anyhow::bail!("{} address(es) failed to refresh", failed);
    }
    Ok(())
}
