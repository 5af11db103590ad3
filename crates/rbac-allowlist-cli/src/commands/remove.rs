//! Remove command - delete exceptions by criteria or by id.

use colored::Colorize;
use rbac_allowlist::RemovalCriteria;

use super::{describe, Context};

pub fn run(
    context: &Context,
    unique_id: Option<String>,
    criteria: RemovalCriteria,
) -> Result<(), Box<dyn std::error::Error>> {
    let allowlist = context.allowlist()?;

    if let Some(id) = unique_id {
        let record = allowlist.remove_exception_by_id(&id)?;
        println!("{} {}", "Removed".green().bold(), describe(&record));
        return Ok(());
    }

    if criteria.is_unrestricted() {
        return Err("Refusing to remove every exception: supply at least one criterion".into());
    }

    let removed = allowlist.remove_exceptions(&criteria)?;
    if removed == 0 {
        println!("{} no exceptions matched", "Warning:".yellow().bold());
    } else {
        println!(
            "{} {} exception{}",
            "Removed".green().bold(),
            removed,
            if removed == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
