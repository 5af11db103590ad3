//! Filter command - partition an audit dataset by the stored exceptions.

use std::path::PathBuf;

use chrono::NaiveDate;
use colored::Colorize;
use rbac_allowlist::output::write_rows_to_path;
use rbac_allowlist::{FilterMode, OutputFormat};

use super::Context;

pub fn run(
    context: &Context,
    dataset: Option<PathBuf>,
    mode: FilterMode,
    output: Option<PathBuf>,
    format: OutputFormat,
    as_of: Option<NaiveDate>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut allowlist = context.allowlist()?;
    if let Some(date) = as_of {
        allowlist = allowlist.as_of(date);
    }

    let report = allowlist.filter_dataset(dataset.as_deref(), mode)?;

    if let Some(source) = &report.source {
        println!("{} {}", "Dataset:".cyan().bold(), source.file.white());
    }
    println!(
        "  {} rows, {} exceptions evaluated",
        report.total_rows, report.exceptions_evaluated
    );
    if !report.enforced {
        println!(
            "{} csaEnforced is off; findings are reported but not suppressed",
            "Warning:".yellow().bold()
        );
    }

    let covered = report.rows.iter().filter(|r| r.matched.is_some()).count();
    println!("  {} {} rows ({} covered by an exception)", report.rows.len(), mode, covered);

    match output {
        Some(path) => {
            write_rows_to_path(&path, &report.headers, &report.rows, format)?;
            println!("{} {}", "Wrote".green().bold(), path.display());
        }
        None if context.verbose => {
            for filtered in &report.rows {
                let marker = match &filtered.matched {
                    Some(m) => format!("[{} {}]", m.approval_kind, m.approval_id).dimmed().to_string(),
                    None => String::new(),
                };
                println!(
                    "    {} {} {} {}",
                    filtered.row.object_id,
                    filtered.row.display_name.white(),
                    filtered.row.role,
                    marker
                );
            }
        }
        None => {}
    }

    Ok(())
}
