//! Doctor command - run ledger health checks

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};
use serde_json::Value;

use super::get_context;
use crate::output;

/// Longest string shown for a detail value; hashes are 64 hex chars
const MAX_DETAIL_LEN: usize = 40;

/// Format a detail JSON value for display
fn format_detail(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let display_val = match v {
                    Value::String(s) if s.chars().count() > MAX_DETAIL_LEN => {
                        let head: String = s.chars().take(MAX_DETAIL_LEN - 3).collect();
                        format!("{}...", head)
                    }
                    Value::String(s) => s.clone(),
                    _ => v.to_string(),
                };
                format!("{}: {}", k, display_val)
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

pub fn run(verbose: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.doctor_service.run_checks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", "Ledger Health Check".bold());
        println!();

        let mut table = output::create_table();
        table.set_header(vec!["Check", "Status", "Message"]);

        for (check_name, check_result) in &result.checks {
            let status_cell = match check_result.status.as_str() {
                "pass" => Cell::new("PASS").fg(Color::Green),
                "warning" => Cell::new("WARN").fg(Color::Yellow),
                "error" => Cell::new("ERROR").fg(Color::Red),
                _ => Cell::new(&check_result.status),
            };

            table.add_row(vec![
                Cell::new(check_name),
                status_cell,
                Cell::new(&check_result.message),
            ]);

            if verbose {
                for detail in check_result.details.iter().flatten() {
                    table.add_row(vec![
                        Cell::new(""),
                        Cell::new(""),
                        Cell::new(format!("  - {}", format_detail(detail))),
                    ]);
                }
            }
        }

        println!("{}", table);
        println!();
        println!(
            "Summary: {} passed, {} warnings, {} errors",
            result.summary.passed.to_string().green(),
            result.summary.warnings.to_string().yellow(),
            result.summary.errors.to_string().red(),
        );
    }

    if !result.is_healthy() {
        std::process::exit(1);
    }

    Ok(())
}
