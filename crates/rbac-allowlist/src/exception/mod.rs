//! The exception data model.
//!
//! An exception records an approved deviation: a Service Principal or other
//! Azure object that is allowed to hold a privileged role at some scope.
//!
//! ```text
//! ExceptionRecord
//! ├── uniqueId, createdOn, lastModifiedOn, lastModifiedBy
//! └── ExceptionRule
//!     ├── identity   ObjectId { objectId } | NamePattern { namePattern, eonId, tenant }
//!     ├── scope?     ObjectId { scopeObjectId } | NamePattern { scopeNamePattern }
//!     ├── scopeType  managementGroup | resourceGroup | subscription
//!     ├── role       Owner | Contributor | UserAccessAdministrator | AppDevContributor
//!     └── approval   SecArch { id } | ActionPlan { id, expiresOn }
//! ```

mod builder;
mod patch;
mod record;
mod types;

pub use builder::{validate_email, ExceptionDraft};
pub use patch::{ExceptionPatch, RemovalCriteria};
pub use record::{
    strip_wildcards, Approval, ApprovalKind, ExceptionRecord, ExceptionRule, Identity,
    ObjectIdentity, PatternIdentity, Scope, ScopeObject, ScopePattern,
};
pub use types::{Role, ScopeType, Tenant};

pub(crate) use types::normalize_label;
