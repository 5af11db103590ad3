//! The dataset filter pass.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::matcher::Matcher;
use crate::exception::{ApprovalKind, ExceptionRecord};
use crate::input::DatasetRow;

/// Which side of the partition a filter pass returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Rows covered by an active exception, annotated with that exception.
    Suppressed,
    /// Rows no exception covers, unchanged.
    #[default]
    Remaining,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "suppressed" | "covered" | "excepted" => Ok(FilterMode::Suppressed),
            "remaining" | "uncovered" | "findings" => Ok(FilterMode::Remaining),
            _ => Err(format!(
                "Unknown filter mode: {}. Use suppressed or remaining.",
                s
            )),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Suppressed => write!(f, "suppressed"),
            FilterMode::Remaining => write!(f, "remaining"),
        }
    }
}

/// Metadata of the exception that suppressed a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnnotation {
    pub exception_id: String,
    pub approval_kind: ApprovalKind,
    pub approval_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    pub last_modified_by: String,
    pub last_modified_on: DateTime<Utc>,
}

impl MatchAnnotation {
    /// Column names used when annotations are written as table columns.
    pub const COLUMNS: [&'static str; 6] = [
        "exceptionId",
        "approvalKind",
        "approvalId",
        "expiresOn",
        "lastModifiedBy",
        "lastModifiedOn",
    ];

    pub fn from_record(record: &ExceptionRecord) -> Self {
        Self {
            exception_id: record.unique_id.clone(),
            approval_kind: record.rule.approval.kind(),
            approval_id: record.rule.approval.id().to_string(),
            expires_on: record.rule.approval.expires_on(),
            last_modified_by: record.last_modified_by.clone(),
            last_modified_on: record.last_modified_on,
        }
    }

    /// Values in the order of [`MatchAnnotation::COLUMNS`].
    pub fn values(&self) -> Vec<String> {
        vec![
            self.exception_id.clone(),
            self.approval_kind.to_string(),
            self.approval_id.clone(),
            self.expires_on.map(|d| d.to_string()).unwrap_or_default(),
            self.last_modified_by.clone(),
            self.last_modified_on.to_rfc3339(),
        ]
    }
}

/// A row emitted by a filter pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredRow {
    #[serde(flatten)]
    pub row: DatasetRow,
    /// Present on suppressed rows only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<MatchAnnotation>,
}

/// Both sides of a filter pass.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub suppressed: Vec<FilteredRow>,
    pub remaining: Vec<FilteredRow>,
}

impl FilterOutcome {
    /// Take one side of the partition.
    pub fn into_mode(self, mode: FilterMode) -> Vec<FilteredRow> {
        match mode {
            FilterMode::Suppressed => self.suppressed,
            FilterMode::Remaining => self.remaining,
        }
    }
}

/// Applies a [`Matcher`] to every (row, exception) pair.
#[derive(Debug, Clone, Copy)]
pub struct FilterPass {
    matcher: Matcher,
    enforced: bool,
}

impl FilterPass {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            enforced: true,
        }
    }

    /// With enforcement off the pass is report-only: every row stays in
    /// `remaining`, while `suppressed` still lists the covered rows.
    pub fn with_enforcement(mut self, enforced: bool) -> Self {
        self.enforced = enforced;
        self
    }

    pub fn partition(&self, rows: &[DatasetRow], exceptions: &[ExceptionRecord]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for row in rows {
            match self.matcher.first_match(row, exceptions) {
                Some(record) => {
                    tracing::debug!(
                        object_id = %row.object_id,
                        exception_id = %record.unique_id,
                        "row covered by exception"
                    );
                    outcome.suppressed.push(FilteredRow {
                        row: row.clone(),
                        matched: Some(MatchAnnotation::from_record(record)),
                    });
                    if !self.enforced {
                        outcome.remaining.push(FilteredRow {
                            row: row.clone(),
                            matched: None,
                        });
                    }
                }
                None => outcome.remaining.push(FilteredRow {
                    row: row.clone(),
                    matched: None,
                }),
            }
        }

        tracing::debug!(
            rows = rows.len(),
            exceptions = exceptions.len(),
            suppressed = outcome.suppressed.len(),
            remaining = outcome.remaining.len(),
            enforced = self.enforced,
            "filter pass complete"
        );

        outcome
    }

    pub fn run(
        &self,
        rows: &[DatasetRow],
        exceptions: &[ExceptionRecord],
        mode: FilterMode,
    ) -> Vec<FilteredRow> {
        self.partition(rows, exceptions).into_mode(mode)
    }
}

impl Default for FilterPass {
    fn default() -> Self {
        Self::new(Matcher::new())
    }
}

/// Filter a dataset against exceptions as of today, with suppression enforced.
pub fn filter(
    rows: &[DatasetRow],
    exceptions: &[ExceptionRecord],
    mode: FilterMode,
) -> Vec<FilteredRow> {
    FilterPass::default().run(rows, exceptions, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{Approval, ExceptionRule, Identity, Role, ScopeType};

    fn record(id: &str, object_id: &str) -> ExceptionRecord {
        let now = Utc::now();
        ExceptionRecord {
            unique_id: id.to_string(),
            rule: ExceptionRule {
                identity: Identity::object_id(object_id),
                scope: None,
                scope_type: ScopeType::ResourceGroup,
                role: Role::Owner,
                approval: Approval::SecArch {
                    id: "SA1".to_string(),
                },
            },
            created_on: now,
            last_modified_on: now,
            last_modified_by: "a@example.com".to_string(),
        }
    }

    fn row(object_id: &str) -> DatasetRow {
        DatasetRow::new(object_id, "name")
            .with_scope("resourceGroup", "rg", "rg")
            .with_role("Owner")
    }

    #[test]
    fn test_empty_exceptions_returns_dataset_unchanged() {
        let rows = vec![row("a"), row("b")];
        let remaining = filter(&rows, &[], FilterMode::Remaining);

        let returned: Vec<DatasetRow> = remaining.into_iter().map(|r| r.row).collect();
        assert_eq!(returned, rows);
    }

    #[test]
    fn test_partition_and_annotation() {
        let rows = vec![row("a"), row("b"), row("c")];
        let exceptions = vec![record("exc_1", "b"), record("exc_2", "B")];

        let outcome = FilterPass::default().partition(&rows, &exceptions);
        assert_eq!(outcome.remaining.len(), 2);
        assert_eq!(outcome.suppressed.len(), 1);

        let annotation = outcome.suppressed[0].matched.as_ref().unwrap();
        assert_eq!(annotation.exception_id, "exc_1");
        assert_eq!(annotation.approval_kind, ApprovalKind::SecArch);
        assert_eq!(annotation.approval_id, "SA1");
        assert!(outcome.remaining.iter().all(|r| r.matched.is_none()));
    }

    #[test]
    fn test_report_only_keeps_all_rows() {
        let rows = vec![row("a"), row("b")];
        let exceptions = vec![record("exc_1", "b")];

        let pass = FilterPass::default().with_enforcement(false);
        assert_eq!(pass.run(&rows, &exceptions, FilterMode::Remaining).len(), 2);
        assert_eq!(pass.run(&rows, &exceptions, FilterMode::Suppressed).len(), 1);
    }

    #[test]
    fn test_filter_mode_parse() {
        assert_eq!("Suppressed".parse::<FilterMode>(), Ok(FilterMode::Suppressed));
        assert_eq!("remaining".parse::<FilterMode>(), Ok(FilterMode::Remaining));
        assert!("both".parse::<FilterMode>().is_err());
    }
}
