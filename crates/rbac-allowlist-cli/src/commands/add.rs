//! Add command - record a new exception.

use colored::Colorize;
use rbac_allowlist::ExceptionDraft;

use super::{describe, Context};

pub fn run(context: &Context, draft: ExceptionDraft) -> Result<(), Box<dyn std::error::Error>> {
    let allowlist = context.allowlist()?;
    let record = allowlist.add_exception(&draft)?;

    println!("{} {}", "Added".green().bold(), describe(&record));
    if context.verbose {
        println!(
            "Stored in {}",
            allowlist.config().exceptions_path.display()
        );
    }

    Ok(())
}
