//! Main Allowlist struct and public API.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::AllowlistConfig;
use crate::error::{AllowlistError, Result};
use crate::exception::{ExceptionDraft, ExceptionPatch, ExceptionRecord, RemovalCriteria};
use crate::input::{latest_dataset, Dataset, DatasetSource};
use crate::matching::{FilterMode, FilterPass, FilteredRow, Matcher};
use crate::store::ExceptionStore;

/// Result of filtering a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    /// Metadata about the dataset file.
    pub source: Option<DatasetSource>,
    /// Dataset column headers, in file order.
    pub headers: Vec<String>,
    /// Which side of the partition `rows` holds.
    pub mode: FilterMode,
    /// Rows in the dataset.
    pub total_rows: usize,
    /// Exceptions evaluated, including inert ones.
    pub exceptions_evaluated: usize,
    /// Whether suppression was enforced.
    pub enforced: bool,
    /// The selected rows.
    pub rows: Vec<FilteredRow>,
}

/// Entry point for every allow-list operation, bound to one configuration.
///
/// # Example
///
/// ```no_run
/// use rbac_allowlist::{Allowlist, AllowlistConfig, FilterMode};
///
/// let allowlist = Allowlist::new(AllowlistConfig::load("config.json").unwrap());
/// let report = allowlist.filter_dataset(None, FilterMode::Remaining).unwrap();
/// println!("{} of {} findings remain", report.rows.len(), report.total_rows);
/// ```
pub struct Allowlist {
    config: AllowlistConfig,
    today: Option<NaiveDate>,
}

impl Allowlist {
    pub fn new(config: AllowlistConfig) -> Self {
        Self {
            config,
            today: None,
        }
    }

    /// Evaluate ActionPlan expiry as of a fixed date instead of today.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &AllowlistConfig {
        &self.config
    }

    fn matcher(&self) -> Matcher {
        match self.today {
            Some(today) => Matcher::as_of(today),
            None => Matcher::new(),
        }
    }

    /// Open the configured exception store.
    pub fn open_store(&self) -> Result<ExceptionStore> {
        ExceptionStore::from_config(&self.config)
    }

    pub fn add_exception(&self, draft: &ExceptionDraft) -> Result<ExceptionRecord> {
        self.open_store()?.add(draft)
    }

    pub fn update_exception(
        &self,
        unique_id: &str,
        patch: &ExceptionPatch,
        modified_by: &str,
    ) -> Result<ExceptionRecord> {
        self.open_store()?.update(unique_id, patch, modified_by)
    }

    pub fn remove_exceptions(&self, criteria: &RemovalCriteria) -> Result<usize> {
        self.open_store()?.remove(criteria)
    }

    pub fn remove_exception_by_id(&self, unique_id: &str) -> Result<ExceptionRecord> {
        self.open_store()?.remove_by_id(unique_id)
    }

    /// The newest dataset export in the configured directory.
    pub fn get_dataset(&self) -> Result<PathBuf> {
        match &self.config.dataset_dir {
            Some(dir) => latest_dataset(dir, self.config.filename_pattern.as_deref().unwrap_or("")),
            None => self.config.resolve_dataset(None),
        }
    }

    /// Filter a dataset file against the stored exceptions.
    ///
    /// Without an explicit `dataset`, the newest configured export is used.
    /// Filtering only reads the store, so a missing store file is an error
    /// rather than an empty allow-list.
    pub fn filter_dataset(&self, dataset: Option<&Path>, mode: FilterMode) -> Result<FilterReport> {
        let path = self.config.resolve_dataset(dataset)?;
        let dataset = Dataset::load(&path)?;

        let store_path = &self.config.exceptions_path;
        if !store_path.exists() {
            return Err(AllowlistError::FileNotFound {
                path: store_path.clone(),
                what: "Exception store".to_string(),
            });
        }
        let store = self.open_store()?;
        Ok(self.filter_loaded(dataset, store.records(), mode))
    }

    /// Filter an already-loaded dataset.
    pub fn filter_loaded(
        &self,
        dataset: Dataset,
        exceptions: &[ExceptionRecord],
        mode: FilterMode,
    ) -> FilterReport {
        let pass = FilterPass::new(self.matcher()).with_enforcement(self.config.csa_enforced);
        let rows = pass.run(&dataset.rows, exceptions, mode);

        if !self.config.csa_enforced {
            tracing::warn!("csaEnforced is off; no findings are suppressed");
        }

        FilterReport {
            source: dataset.source,
            headers: dataset.headers,
            mode,
            total_rows: dataset.rows.len(),
            exceptions_evaluated: exceptions.len(),
            enforced: self.config.csa_enforced,
            rows,
        }
    }
}
