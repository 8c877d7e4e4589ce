//! Info command - stored balances and histories for an account

use anyhow::Result;
use cointrack_core::LogEvent;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};

use super::{get_context, get_logger, log_event, Credentials};
use crate::output;

pub fn run(credentials: Credentials, transactions: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let password = credentials.password()?;

    let summary = ctx
        .account_service
        .get_account_info(&credentials.user, &password)?;
    log_event(
        &logger,
        LogEvent::new("account_viewed").with_count(summary.addresses.len() as u64),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.addresses.is_empty() {
        output::info("No addresses tracked. Add one with: ct add <address>");
        return Ok(());
    }

    println!("{}", format!("Account: {}", credentials.user).bold());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Address", "Balance", "Transactions"]);
    for address in &summary.addresses {
        table.add_row(vec![
            Cell::new(&address.address),
            Cell::new(output::format_btc(address.balance)).set_alignment(CellAlignment::Right),
            Cell::new(address.transactions.len()).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
    println!();
    println!(
        "Total: {} across {} transaction(s)",
        output::format_btc(summary.account_balance).bold(),
        summary.total_transaction_count
    );

    if transactions {
        for address in summary.addresses.iter().filter(|a| !a.transactions.is_empty()) {
            println!();
            println!("{}", address.address.cyan());

            let mut table = output::create_table();
            table.set_header(vec!["Hash", "Block", "Amount"]);
            for tx in &address.transactions {
                let block = if tx.is_confirmed() {
                    tx.block.to_string()
                } else {
                    "unconfirmed".dimmed().to_string()
                };
                let amount = output::format_btc_delta(tx.result);
                let amount = if tx.result < 0 { amount.red() } else { amount.green() };
                table.add_row(vec![
                    Cell::new(&tx.hash),
                    Cell::new(block).set_alignment(CellAlignment::Right),
                    Cell::new(amount).set_alignment(CellAlignment::Right),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
