//! Persistent exception store.
//!
//! The store is a single JSON file, either a flat array of records or an
//! object partitioned by approval kind:
//!
//! ```text
//! [ { "uniqueId": "exc_…", "identity": {...}, ... }, ... ]
//!
//! { "SecArchExceptions": [ ... ], "ActionPlanExceptions": [ ... ] }
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use rbac_allowlist::exception::{ExceptionDraft, RemovalCriteria};
//! use rbac_allowlist::store::ExceptionStore;
//!
//! let mut store = ExceptionStore::open("exceptions.json").unwrap();
//!
//! let record = store
//!     .add(
//!         &ExceptionDraft::new()
//!             .with_object_id("00000000-0000-0000-0000-000000000001")
//!             .with_scope_type("resourceGroup")
//!             .with_role("Owner")
//!             .with_sec_arch("SA-1024")
//!             .with_modified_by("secarch@example.com"),
//!     )
//!     .unwrap();
//!
//! let removed = store
//!     .remove(&RemovalCriteria::new().with_object_id("00000000-0000-0000-0000-000000000001"))
//!     .unwrap();
//! assert_eq!(removed, 1);
//! # let _ = record;
//! ```

mod exception_store;
mod persistence;

pub use exception_store::{ExceptionStore, StoreOptions};
pub use persistence::{list_history, StoreLayout};
