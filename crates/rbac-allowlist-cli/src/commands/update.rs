//! Update command - change fields of an existing exception.

use colored::Colorize;
use rbac_allowlist::ExceptionPatch;

use super::{describe, Context};

pub fn run(
    context: &Context,
    unique_id: &str,
    patch: ExceptionPatch,
    modified_by: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if patch.is_empty() {
        return Err("Nothing to update: supply at least one field to change".into());
    }

    let record = context
        .allowlist()?
        .update_exception(unique_id, &patch, modified_by)?;

    println!("{} {}", "Updated".green().bold(), describe(&record));
    Ok(())
}
