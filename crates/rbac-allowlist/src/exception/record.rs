//! Exception records and their tagged identity, scope and approval forms.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Role, ScopeType, Tenant};

/// Characters treated as wildcard tokens in name patterns.
const WILDCARD_TOKENS: &[char] = &['*', '?', '%'];

/// Remove wildcard tokens from a name pattern, leaving the substring to search for.
pub fn strip_wildcards(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|c| !WILDCARD_TOKENS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Exact identification of a single Azure object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObjectIdentity {
    pub object_id: String,
}

/// Wildcard identification by display name, pinned to an application and tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternIdentity {
    pub name_pattern: String,
    pub eon_id: String,
    pub tenant: Tenant,
}

impl PatternIdentity {
    /// The substring a display name must contain.
    pub fn effective_pattern(&self) -> String {
        strip_wildcards(&self.name_pattern)
    }
}

/// Which object(s) an exception covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    /// Match one object by id.
    ObjectId(ObjectIdentity),
    /// Match every object of an application whose display name contains a pattern.
    NamePattern(PatternIdentity),
}

impl Identity {
    /// Create an exact-id identity.
    pub fn object_id(id: impl Into<String>) -> Self {
        Identity::ObjectId(ObjectIdentity {
            object_id: id.into(),
        })
    }

    /// Create a wildcard identity.
    pub fn name_pattern(
        pattern: impl Into<String>,
        eon_id: impl Into<String>,
        tenant: Tenant,
    ) -> Self {
        Identity::NamePattern(PatternIdentity {
            name_pattern: pattern.into(),
            eon_id: eon_id.into(),
            tenant,
        })
    }

    fn signature(&self) -> String {
        match self {
            Identity::ObjectId(id) => format!("id:{}", id.object_id.to_lowercase()),
            Identity::NamePattern(p) => format!(
                "pattern:{}:{}:{}",
                p.effective_pattern().to_lowercase(),
                p.eon_id.to_lowercase(),
                p.tenant
            ),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::ObjectId(id) => write!(f, "{}", id.object_id),
            Identity::NamePattern(p) => {
                write!(f, "*{}* ({}, {})", p.effective_pattern(), p.eon_id, p.tenant)
            }
        }
    }
}

/// Scope restriction by exact scope object id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScopeObject {
    pub scope_object_id: String,
}

/// Scope restriction by scope display name substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScopePattern {
    pub scope_name_pattern: String,
}

impl ScopePattern {
    /// The substring a scope display name must contain.
    pub fn effective_pattern(&self) -> String {
        strip_wildcards(&self.scope_name_pattern)
    }
}

/// Restricts an exception to particular scopes of its scope type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scope {
    ObjectId(ScopeObject),
    NamePattern(ScopePattern),
}

impl Scope {
    /// Restrict to one scope object.
    pub fn object_id(id: impl Into<String>) -> Self {
        Scope::ObjectId(ScopeObject {
            scope_object_id: id.into(),
        })
    }

    /// Restrict to scopes whose display name contains a pattern.
    pub fn name_pattern(pattern: impl Into<String>) -> Self {
        Scope::NamePattern(ScopePattern {
            scope_name_pattern: pattern.into(),
        })
    }

    fn signature(&self) -> String {
        match self {
            Scope::ObjectId(s) => format!("id:{}", s.scope_object_id.to_lowercase()),
            Scope::NamePattern(s) => format!("pattern:{}", s.effective_pattern().to_lowercase()),
        }
    }
}

/// Kind of approval backing an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalKind {
    /// Permanent security-architecture approval.
    SecArch,
    /// Time-bound approval with a mandatory expiry.
    ActionPlan,
}

impl fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalKind::SecArch => write!(f, "SecArch"),
            ApprovalKind::ActionPlan => write!(f, "ActionPlan"),
        }
    }
}

/// The approval that authorizes an exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Approval {
    SecArch {
        id: String,
    },
    ActionPlan {
        id: String,
        #[serde(rename = "expiresOn")]
        expires_on: NaiveDate,
    },
}

impl Approval {
    pub fn kind(&self) -> ApprovalKind {
        match self {
            Approval::SecArch { .. } => ApprovalKind::SecArch,
            Approval::ActionPlan { .. } => ApprovalKind::ActionPlan,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Approval::SecArch { id } | Approval::ActionPlan { id, .. } => id,
        }
    }

    /// Expiry date, for time-bound approvals only.
    pub fn expires_on(&self) -> Option<NaiveDate> {
        match self {
            Approval::SecArch { .. } => None,
            Approval::ActionPlan { expires_on, .. } => Some(*expires_on),
        }
    }

    /// An ActionPlan stops being honoured the day after its expiry date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on().is_some_and(|expires| expires < today)
    }

    fn signature(&self) -> String {
        match self {
            Approval::SecArch { id } => format!("secarch:{}", id.to_lowercase()),
            Approval::ActionPlan { id, expires_on } => {
                format!("actionplan:{}:{}", id.to_lowercase(), expires_on)
            }
        }
    }
}

/// The policy content of an exception, without bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRule {
    pub identity: Identity,

    /// Absent means every object of `scope_type` is covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,

    pub scope_type: ScopeType,

    pub role: Role,

    pub approval: Approval,
}

impl ExceptionRule {
    /// Key used for duplicate detection. Comparison is case-insensitive.
    pub fn signature(&self) -> String {
        let scope = self
            .scope
            .as_ref()
            .map(Scope::signature)
            .unwrap_or_else(|| "any".to_string());
        format!(
            "{}|{}|{}|{}|{}",
            self.identity.signature(),
            scope,
            self.scope_type,
            self.role,
            self.approval.signature()
        )
    }
}

/// A stored exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    /// Immutable identifier used for update/delete addressing.
    pub unique_id: String,

    #[serde(flatten)]
    pub rule: ExceptionRule,

    pub created_on: DateTime<Utc>,

    pub last_modified_on: DateTime<Utc>,

    pub last_modified_by: String,
}

impl ExceptionRecord {
    pub fn approval_kind(&self) -> ApprovalKind {
        self.rule.approval.kind()
    }

    /// Whether the approval is still honoured on `today`.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        !self.rule.approval.is_expired(today)
    }
}
