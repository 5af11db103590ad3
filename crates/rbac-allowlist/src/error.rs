//! Error types for the allow-list library.

use std::path::PathBuf;

use thiserror::Error;

/// The record invariant that a candidate exception violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRule {
    /// Both an object id and a name pattern were supplied.
    #[error("provide either an object id or a name pattern, not both")]
    ConflictingIdentity,

    /// Neither an object id nor a name pattern was supplied.
    #[error("an object id or a name pattern is required")]
    MissingIdentity,

    /// Both a scope object id and a scope name pattern were supplied.
    #[error("provide either a scope object id or a scope name pattern, not both")]
    ConflictingScope,

    /// Both a SecArch id and an ActionPlan id were supplied.
    #[error("provide either a SecArch id or an ActionPlan id, not both")]
    ConflictingApproval,

    /// No approval was supplied.
    #[error("a SecArch id or an ActionPlan id is required")]
    MissingApproval,

    /// An ActionPlan approval without an expiry date.
    #[error("an ActionPlan approval requires an expiry date")]
    MissingExpiry,

    /// An expiry date supplied alongside a permanent SecArch approval.
    #[error("an expiry date is only valid with an ActionPlan approval")]
    ExpiryWithoutActionPlan,

    /// A name pattern without the owning application's EonID.
    #[error("a name pattern requires an EonID")]
    MissingEonId,

    /// A name pattern without a tenant.
    #[error("a name pattern requires a tenant")]
    MissingTenant,

    /// A name pattern that is empty once wildcard tokens are stripped.
    #[error("the name pattern is empty once wildcards are removed")]
    EmptyNamePattern,

    /// A scope name pattern that is empty once wildcard tokens are stripped.
    #[error("the scope name pattern is empty once wildcards are removed; omit the scope instead")]
    EmptyScopePattern,

    /// No scope type was supplied.
    #[error("a scope type is required")]
    MissingScopeType,

    /// No role was supplied.
    #[error("a role is required")]
    MissingRole,

    /// `lastModifiedBy` is empty or not shaped like an email address.
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    /// A value that does not name a known variant of an enumerated field.
    #[error("unknown {field}: '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// Main error type for allow-list operations.
#[derive(Debug, Error)]
pub enum AllowlistError {
    /// A candidate record violates an invariant.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationRule),

    /// An identical exception is already stored.
    #[error("Duplicate exception: identical to existing record '{existing_id}'")]
    Duplicate { existing_id: String },

    /// No record carries the requested unique id.
    #[error("Exception not found: {0}")]
    NotFound(String),

    /// A required input file or directory does not exist.
    #[error("{what} not found: {}", path.display())]
    FileNotFound { path: PathBuf, what: String },

    /// Malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error reading or accessing a file.
    #[error("IO error for '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reading or writing the exception store.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Empty file or missing columns.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// The store file changed on disk after it was loaded.
    #[error("Exception store '{}' was modified by another writer since it was loaded", path.display())]
    ConcurrentModification { path: PathBuf },
}

/// Result type alias for allow-list operations.
pub type Result<T> = std::result::Result<T, AllowlistError>;
