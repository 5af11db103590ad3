//! rbac-allowlist: exception management for Azure RBAC audit findings.
//!
//! A periodic audit lists Service Principals and other Azure objects holding
//! privileged roles. Some of those assignments are approved deviations. This
//! crate records the approvals as exceptions in a JSON store and filters the
//! audit dataset so that covered findings are suppressed.
//!
//! # Core Principles
//!
//! - **Explicit rules**: identity, scope and approval are tagged variants, so
//!   an exception with both or neither identity forms cannot be constructed
//! - **Time-bound approvals**: an expired ActionPlan suppresses nothing
//! - **Traceable suppression**: every suppressed row carries the exception
//!   that covered it
//!
//! # Example
//!
//! ```no_run
//! use rbac_allowlist::{filter, Dataset, ExceptionStore, FilterMode};
//!
//! let store = ExceptionStore::open("exceptions.json").unwrap();
//! let dataset = Dataset::load("rbac_audit.csv").unwrap();
//!
//! let remaining = filter(&dataset.rows, store.records(), FilterMode::Remaining);
//! println!("Findings: {}", remaining.len());
//! ```

pub mod config;
pub mod error;
pub mod exception;
pub mod input;
pub mod matching;
pub mod output;
pub mod store;

mod allowlist;

pub use crate::allowlist::{Allowlist, FilterReport};
pub use config::AllowlistConfig;
pub use error::{AllowlistError, Result, ValidationRule};
pub use exception::{
    Approval, ApprovalKind, ExceptionDraft, ExceptionPatch, ExceptionRecord, ExceptionRule,
    Identity, RemovalCriteria, Role, Scope, ScopeType, Tenant,
};
pub use input::{Dataset, DatasetRow, DatasetSource};
pub use matching::{filter, FilterMode, FilterOutcome, FilterPass, FilteredRow, MatchAnnotation, Matcher};
pub use output::OutputFormat;
pub use store::{ExceptionStore, StoreLayout, StoreOptions};
