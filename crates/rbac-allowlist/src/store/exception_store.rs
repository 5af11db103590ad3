//! The exception store: the in-memory collection and its mutations.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

use super::persistence::{self, StoreLayout};
use crate::config::AllowlistConfig;
use crate::error::{AllowlistError, Result};
use crate::exception::{
    ApprovalKind, ExceptionDraft, ExceptionPatch, ExceptionRecord, ExceptionRule, RemovalCriteria,
};

/// Options controlling how the store writes its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Layout used when the file does not exist yet.
    pub default_layout: StoreLayout,
    /// Archive the previous file before each overwrite.
    pub keep_history: bool,
    /// Refuse to save when the file changed since it was loaded.
    pub optimistic_locking: bool,
}

impl StoreOptions {
    pub fn from_config(config: &AllowlistConfig) -> Self {
        Self {
            default_layout: config.layout,
            keep_history: config.keep_history,
            optimistic_locking: config.optimistic_locking,
        }
    }
}

/// A JSON-backed collection of exception records.
///
/// Every mutation rewrites the whole file. The store assumes a single writer:
/// two processes mutating the same file concurrently can lose updates (last
/// writer wins). [`StoreOptions::optimistic_locking`] turns a lost update into
/// a [`AllowlistError::ConcurrentModification`] error instead.
#[derive(Debug)]
pub struct ExceptionStore {
    path: PathBuf,
    layout: StoreLayout,
    options: StoreOptions,
    records: Vec<ExceptionRecord>,
    fingerprint: Option<String>,
}

impl ExceptionStore {
    /// Open a store file with default options. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Open a store file with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let loaded = persistence::read_store(&path)?;

        Ok(Self {
            layout: loaded.layout.unwrap_or(options.default_layout),
            path,
            options,
            records: loaded.records,
            fingerprint: loaded.fingerprint,
        })
    }

    /// Open the store named by a configuration.
    pub fn from_config(config: &AllowlistConfig) -> Result<Self> {
        Self::open_with(&config.exceptions_path, StoreOptions::from_config(config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> StoreLayout {
        self.layout
    }

    /// Records in store order.
    pub fn records(&self) -> &[ExceptionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, unique_id: &str) -> Option<&ExceptionRecord> {
        self.records.iter().find(|r| r.unique_id == unique_id)
    }

    /// ActionPlan exceptions whose expiry date is before `today`.
    pub fn expired(&self, today: NaiveDate) -> Vec<&ExceptionRecord> {
        self.records.iter().filter(|r| !r.is_active(today)).collect()
    }

    /// Validate a draft and append it as a new exception.
    pub fn add(&mut self, draft: &ExceptionDraft) -> Result<ExceptionRecord> {
        let (rule, modified_by) = draft.validate()?;
        self.ensure_unique(&rule, None)?;

        let now = Utc::now();
        let record = ExceptionRecord {
            unique_id: self.generate_unique_id(&rule),
            rule,
            created_on: now,
            last_modified_on: now,
            last_modified_by: modified_by,
        };

        let previous = self.records.clone();
        self.records.push(record.clone());
        self.restore_partition_order();
        self.commit(previous)?;

        tracing::info!(
            unique_id = %record.unique_id,
            approval = %record.approval_kind(),
            "added exception"
        );
        Ok(record)
    }

    /// Apply a partial update to the record with `unique_id`.
    pub fn update(
        &mut self,
        unique_id: &str,
        patch: &ExceptionPatch,
        modified_by: &str,
    ) -> Result<ExceptionRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.unique_id == unique_id)
            .ok_or_else(|| AllowlistError::NotFound(unique_id.to_string()))?;

        let (rule, modified_by) = patch.apply_to(&self.records[index], modified_by).validate()?;
        self.ensure_unique(&rule, Some(unique_id))?;

        let previous = self.records.clone();
        let record = &mut self.records[index];
        record.rule = rule;
        record.last_modified_on = Utc::now();
        record.last_modified_by = modified_by;
        let updated = record.clone();

        self.restore_partition_order();
        self.commit(previous)?;

        tracing::info!(unique_id = %updated.unique_id, "updated exception");
        Ok(updated)
    }

    /// Remove every record matching all supplied criteria. Returns the count.
    pub fn remove(&mut self, criteria: &RemovalCriteria) -> Result<usize> {
        let previous = self.records.clone();
        self.records.retain(|r| !criteria.matches(r));
        let removed = previous.len() - self.records.len();

        if removed == 0 {
            tracing::warn!(
                criteria = ?criteria,
                "no exceptions matched the removal criteria; check filter criteria"
            );
            return Ok(0);
        }

        self.commit(previous)?;
        tracing::info!(removed, "removed exceptions");
        Ok(removed)
    }

    /// Remove one record by its unique id.
    pub fn remove_by_id(&mut self, unique_id: &str) -> Result<ExceptionRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.unique_id == unique_id)
            .ok_or_else(|| AllowlistError::NotFound(unique_id.to_string()))?;

        let previous = self.records.clone();
        let removed = self.records.remove(index);
        self.commit(previous)?;

        tracing::info!(unique_id = %removed.unique_id, "removed exception");
        Ok(removed)
    }

    /// Write the whole collection to the backing file.
    pub fn save(&mut self) -> Result<()> {
        if self.options.optimistic_locking {
            let on_disk = persistence::current_fingerprint(&self.path)?;
            if on_disk != self.fingerprint {
                return Err(AllowlistError::ConcurrentModification {
                    path: self.path.clone(),
                });
            }
        }

        if self.options.keep_history {
            if let Some(archived) = persistence::archive_to_history(&self.path)? {
                tracing::debug!(archive = %archived.display(), "archived previous store");
            }
        }

        let bytes = persistence::encode_store(&self.records, self.layout)?;
        persistence::write_store(&self.path, &bytes)?;
        self.fingerprint = Some(persistence::fingerprint(&bytes));

        tracing::info!(
            path = %self.path.display(),
            records = self.records.len(),
            layout = ?self.layout,
            "saved exception store"
        );
        Ok(())
    }

    /// Save, restoring the previous in-memory collection if the write fails.
    fn commit(&mut self, previous: Vec<ExceptionRecord>) -> Result<()> {
        if let Err(e) = self.save() {
            self.records = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Load an archived version, newest first by index.
    pub fn load_history(&self, index: usize) -> Result<Vec<ExceptionRecord>> {
        let history = persistence::list_history(&self.path)?;

        let history_path = history.get(index).ok_or_else(|| {
            AllowlistError::Persistence(format!(
                "History version {} not found (only {} versions available)",
                index,
                history.len()
            ))
        })?;

        Ok(persistence::read_store(history_path)?.records)
    }

    fn ensure_unique(&self, rule: &ExceptionRule, except_id: Option<&str>) -> Result<()> {
        let signature = rule.signature();
        match self
            .records
            .iter()
            .filter(|r| Some(r.unique_id.as_str()) != except_id)
            .find(|r| r.rule.signature() == signature)
        {
            Some(existing) => Err(AllowlistError::Duplicate {
                existing_id: existing.unique_id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Keep SecArch records ahead of ActionPlan records so memory matches file order.
    fn restore_partition_order(&mut self) {
        if self.layout == StoreLayout::Partitioned {
            self.records
                .sort_by_key(|r| r.approval_kind() != ApprovalKind::SecArch);
        }
    }

    fn generate_unique_id(&self, rule: &ExceptionRule) -> String {
        loop {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            let mut hasher = Sha256::new();
            hasher.update(rule.signature().as_bytes());
            hasher.update(nanos.to_le_bytes());
            hasher.update(fastrand::u64(..).to_le_bytes());
            let digest = format!("{:x}", hasher.finalize());
            let id = format!("exc_{}", &digest[..16]);

            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(object_id: &str) -> ExceptionDraft {
        ExceptionDraft::new()
            .with_object_id(object_id)
            .with_scope_type("resourceGroup")
            .with_role("Owner")
            .with_sec_arch("SA1")
            .with_modified_by("owner@example.com")
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let dir = TempDir::new().unwrap();
        let mut store = ExceptionStore::open(dir.path().join("exceptions.json")).unwrap();

        let a = store.add(&draft("SPN1")).unwrap();
        let b = store.add(&draft("SPN2")).unwrap();

        assert!(a.unique_id.starts_with("exc_"));
        assert_eq!(a.unique_id.len(), 20);
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[test]
    fn test_partitioned_order_kept_in_memory() {
        let dir = TempDir::new().unwrap();
        let options = StoreOptions {
            default_layout: StoreLayout::Partitioned,
            ..StoreOptions::default()
        };
        let mut store = ExceptionStore::open_with(dir.path().join("ex.json"), options).unwrap();

        let plan = ExceptionDraft::new()
            .with_object_id("SPN9")
            .with_scope_type("subscription")
            .with_role("Contributor")
            .with_action_plan("AP1", NaiveDate::from_ymd_opt(2099, 1, 1).unwrap())
            .with_modified_by("owner@example.com");
        store.add(&plan).unwrap();
        store.add(&draft("SPN1")).unwrap();

        assert_eq!(store.records()[0].approval_kind(), ApprovalKind::SecArch);
        assert_eq!(store.records()[1].approval_kind(), ApprovalKind::ActionPlan);

        let reopened = ExceptionStore::open(store.path()).unwrap();
        assert_eq!(reopened.records(), store.records());
        assert_eq!(reopened.layout(), StoreLayout::Partitioned);
    }
}
