//! CLI command implementations.

pub mod add;
pub mod filter;
pub mod get_dataset;
pub mod list;
pub mod remove;
pub mod update;

use std::path::PathBuf;

use colored::Colorize;
use rbac_allowlist::{Allowlist, AllowlistConfig, ExceptionRecord};

/// Global options shared by every command.
pub struct Context {
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub verbose: bool,
}

impl Context {
    /// Configuration from `--config` (or defaults), with `--store` applied on top.
    pub fn load_config(&self) -> Result<AllowlistConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => AllowlistConfig::load(path)?,
            None => AllowlistConfig::new(),
        };

        if let Some(store) = &self.store {
            config = config.with_exceptions_path(store);
        }

        tracing::debug!(store = %config.exceptions_path.display(), "using exception store");
        Ok(config)
    }

    pub fn allowlist(&self) -> Result<Allowlist, Box<dyn std::error::Error>> {
        Ok(Allowlist::new(self.load_config()?))
    }
}

/// One-line human-readable summary of an exception.
pub fn describe(record: &ExceptionRecord) -> String {
    let rule = &record.rule;
    let approval = match rule.approval.expires_on() {
        Some(expires) => format!("{} {} (expires {})", rule.approval.kind(), rule.approval.id(), expires),
        None => format!("{} {}", rule.approval.kind(), rule.approval.id()),
    };

    format!(
        "{} {} {} @ {} [{}]",
        record.unique_id.cyan(),
        rule.identity.to_string().white().bold(),
        rule.role,
        rule.scope_type,
        approval
    )
}
