//! Validation of user-supplied exception fields into a well-formed rule.
//!
//! Callers (the CLI, scripts) supply identification and approval fields as a
//! loose set of optional values. [`ExceptionDraft::validate`] checks them in a
//! fixed order and either produces an [`ExceptionRule`], whose tagged variants
//! cannot express an illegal combination, or names the first violated rule.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationRule};

use super::record::{strip_wildcards, Approval, ExceptionRule, Identity, Scope};
use super::types::{Role, ScopeType, Tenant};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

/// Check that a value is shaped like an email address.
pub fn validate_email(value: &str) -> std::result::Result<(), ValidationRule> {
    if EMAIL_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationRule::InvalidEmail(value.to_string()))
    }
}

enum IdentityInput<'a> {
    ObjectId(&'a str),
    NamePattern(&'a str),
}

/// Treat blank strings the same as absent ones.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Unvalidated exception fields as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionDraft {
    pub object_id: Option<String>,
    pub name_pattern: Option<String>,
    pub eon_id: Option<String>,
    pub tenant: Option<String>,
    pub scope_object_id: Option<String>,
    pub scope_name_pattern: Option<String>,
    pub scope_type: Option<String>,
    pub role: Option<String>,
    pub sec_arch_id: Option<String>,
    pub action_plan_id: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub modified_by: Option<String>,
}

impl ExceptionDraft {
    /// Create an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identify a single object by id.
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Identify objects by display-name pattern.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn with_eon_id(mut self, eon_id: impl Into<String>) -> Self {
        self.eon_id = Some(eon_id.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_scope_object_id(mut self, id: impl Into<String>) -> Self {
        self.scope_object_id = Some(id.into());
        self
    }

    pub fn with_scope_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.scope_name_pattern = Some(pattern.into());
        self
    }

    pub fn with_scope_type(mut self, scope_type: impl Into<String>) -> Self {
        self.scope_type = Some(scope_type.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Back the exception with a permanent SecArch approval.
    pub fn with_sec_arch(mut self, id: impl Into<String>) -> Self {
        self.sec_arch_id = Some(id.into());
        self
    }

    /// Back the exception with a time-bound ActionPlan approval.
    pub fn with_action_plan(mut self, id: impl Into<String>, expires_on: NaiveDate) -> Self {
        self.action_plan_id = Some(id.into());
        self.expires_on = Some(expires_on);
        self
    }

    pub fn with_expires_on(mut self, expires_on: NaiveDate) -> Self {
        self.expires_on = Some(expires_on);
        self
    }

    pub fn with_modified_by(mut self, email: impl Into<String>) -> Self {
        self.modified_by = Some(email.into());
        self
    }

    /// Rebuild a draft from an existing rule, for partial updates.
    pub fn from_rule(rule: &ExceptionRule, modified_by: Option<String>) -> Self {
        let mut draft = Self::new();
        match &rule.identity {
            Identity::ObjectId(id) => draft.object_id = Some(id.object_id.clone()),
            Identity::NamePattern(p) => {
                draft.name_pattern = Some(p.name_pattern.clone());
                draft.eon_id = Some(p.eon_id.clone());
                draft.tenant = Some(p.tenant.to_string());
            }
        }
        match &rule.scope {
            Some(Scope::ObjectId(s)) => draft.scope_object_id = Some(s.scope_object_id.clone()),
            Some(Scope::NamePattern(s)) => {
                draft.scope_name_pattern = Some(s.scope_name_pattern.clone())
            }
            None => {}
        }
        draft.scope_type = Some(rule.scope_type.to_string());
        draft.role = Some(rule.role.to_string());
        match &rule.approval {
            Approval::SecArch { id } => draft.sec_arch_id = Some(id.clone()),
            Approval::ActionPlan { id, expires_on } => {
                draft.action_plan_id = Some(id.clone());
                draft.expires_on = Some(*expires_on);
            }
        }
        draft.modified_by = modified_by;
        draft
    }

    /// Validate the draft and produce the rule plus the normalized modifier email.
    ///
    /// Checks run in this order and stop at the first failure: identity
    /// exclusivity, scope exclusivity, approval presence and exclusivity,
    /// ActionPlan expiry, wildcard identity requirements, then scope type,
    /// role and modifier email.
    pub fn validate(&self) -> Result<(ExceptionRule, String)> {
        let object_id = present(&self.object_id);
        let name_pattern = present(&self.name_pattern);
        let identity_input = match (object_id, name_pattern) {
            (Some(_), Some(_)) => return Err(ValidationRule::ConflictingIdentity.into()),
            (None, None) => return Err(ValidationRule::MissingIdentity.into()),
            (Some(id), None) => IdentityInput::ObjectId(id),
            (None, Some(pattern)) => IdentityInput::NamePattern(pattern),
        };

        let scope = match (
            present(&self.scope_object_id),
            present(&self.scope_name_pattern),
        ) {
            (Some(_), Some(_)) => return Err(ValidationRule::ConflictingScope.into()),
            (Some(id), None) => Some(Scope::object_id(id)),
            (None, Some(pattern)) => {
                if strip_wildcards(pattern).is_empty() {
                    return Err(ValidationRule::EmptyScopePattern.into());
                }
                Some(Scope::name_pattern(pattern))
            }
            (None, None) => None,
        };

        let approval = match (present(&self.sec_arch_id), present(&self.action_plan_id)) {
            (Some(_), Some(_)) => return Err(ValidationRule::ConflictingApproval.into()),
            (None, None) => return Err(ValidationRule::MissingApproval.into()),
            (Some(id), None) => {
                if self.expires_on.is_some() {
                    return Err(ValidationRule::ExpiryWithoutActionPlan.into());
                }
                Approval::SecArch { id: id.to_string() }
            }
            (None, Some(id)) => match self.expires_on {
                Some(expires_on) => Approval::ActionPlan {
                    id: id.to_string(),
                    expires_on,
                },
                None => return Err(ValidationRule::MissingExpiry.into()),
            },
        };

        let identity = match identity_input {
            IdentityInput::ObjectId(id) => Identity::object_id(id),
            IdentityInput::NamePattern(pattern) => {
                let eon_id = present(&self.eon_id).ok_or(ValidationRule::MissingEonId)?;
                let tenant = present(&self.tenant)
                    .ok_or(ValidationRule::MissingTenant)?
                    .parse::<Tenant>()?;
                if strip_wildcards(pattern).is_empty() {
                    return Err(ValidationRule::EmptyNamePattern.into());
                }
                Identity::name_pattern(pattern, eon_id, tenant)
            }
        };

        let scope_type = present(&self.scope_type)
            .ok_or(ValidationRule::MissingScopeType)?
            .parse::<ScopeType>()?;
        let role = present(&self.role)
            .ok_or(ValidationRule::MissingRole)?
            .parse::<Role>()?;

        let modified_by = present(&self.modified_by)
            .ok_or_else(|| ValidationRule::InvalidEmail(String::new()))?;
        validate_email(modified_by)?;

        let rule = ExceptionRule {
            identity,
            scope,
            scope_type,
            role,
            approval,
        };
        Ok((rule, modified_by.to_string()))
    }
}
