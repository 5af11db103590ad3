//! List command - show stored exceptions.

use chrono::Utc;
use colored::Colorize;

use super::{describe, Context};

pub fn run(context: &Context, expired_only: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = context.allowlist()?.open_store()?;
    let today = Utc::now().date_naive();

    let records: Vec<_> = if expired_only {
        store.expired(today)
    } else {
        store.records().iter().collect()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{} {} ({} {})",
        "Exceptions in".cyan().bold(),
        store.path().display().to_string().white(),
        records.len(),
        if expired_only { "expired" } else { "total" }
    );
    println!();

    for record in records {
        let line = describe(record);
        if record.is_active(today) {
            println!("  {}", line);
        } else {
            println!("  {} {}", line, "EXPIRED".red().bold());
        }
    }

    Ok(())
}
