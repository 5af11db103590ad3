//! Partial updates and removal criteria.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::builder::ExceptionDraft;
use super::record::{strip_wildcards, ExceptionRecord, Identity, Scope};

/// Fields to change on an existing exception. `None` keeps the stored value.
///
/// Identity, scope and approval are each one tagged form. Supplying a field
/// that belongs to the other form of a group replaces the whole group, so an
/// exact-id exception can be turned into a wildcard one by supplying the
/// pattern, EonID and tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionPatch {
    pub object_id: Option<String>,
    pub name_pattern: Option<String>,
    pub eon_id: Option<String>,
    pub tenant: Option<String>,
    pub scope_object_id: Option<String>,
    pub scope_name_pattern: Option<String>,
    /// Drop the scope restriction entirely.
    #[serde(default)]
    pub clear_scope: bool,
    pub scope_type: Option<String>,
    pub role: Option<String>,
    pub sec_arch_id: Option<String>,
    pub action_plan_id: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

impl ExceptionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

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

    pub fn clearing_scope(mut self) -> Self {
        self.clear_scope = true;
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

    pub fn with_sec_arch(mut self, id: impl Into<String>) -> Self {
        self.sec_arch_id = Some(id.into());
        self
    }

    pub fn with_action_plan(mut self, id: impl Into<String>) -> Self {
        self.action_plan_id = Some(id.into());
        self
    }

    pub fn with_expires_on(mut self, expires_on: NaiveDate) -> Self {
        self.expires_on = Some(expires_on);
        self
    }

    /// Whether the patch changes any rule field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the patch on a stored record, producing a draft to revalidate.
    pub fn apply_to(&self, record: &ExceptionRecord, modified_by: &str) -> ExceptionDraft {
        let mut draft = ExceptionDraft::from_rule(&record.rule, Some(modified_by.to_string()));

        let touches_pattern =
            self.name_pattern.is_some() || self.eon_id.is_some() || self.tenant.is_some();
        if self.object_id.is_some() && matches!(record.rule.identity, Identity::NamePattern(_)) {
            draft.name_pattern = None;
            draft.eon_id = None;
            draft.tenant = None;
        }
        if touches_pattern && matches!(record.rule.identity, Identity::ObjectId(_)) {
            draft.object_id = None;
        }
        overlay(&mut draft.object_id, &self.object_id);
        overlay(&mut draft.name_pattern, &self.name_pattern);
        overlay(&mut draft.eon_id, &self.eon_id);
        overlay(&mut draft.tenant, &self.tenant);

        if self.clear_scope {
            draft.scope_object_id = None;
            draft.scope_name_pattern = None;
        }
        if self.scope_object_id.is_some()
            && matches!(record.rule.scope, Some(Scope::NamePattern(_)))
        {
            draft.scope_name_pattern = None;
        }
        if self.scope_name_pattern.is_some()
            && matches!(record.rule.scope, Some(Scope::ObjectId(_)))
        {
            draft.scope_object_id = None;
        }
        overlay(&mut draft.scope_object_id, &self.scope_object_id);
        overlay(&mut draft.scope_name_pattern, &self.scope_name_pattern);

        overlay(&mut draft.scope_type, &self.scope_type);
        overlay(&mut draft.role, &self.role);

        if self.sec_arch_id.is_some() && draft.action_plan_id.is_some() {
            draft.action_plan_id = None;
            draft.expires_on = None;
        }
        if self.action_plan_id.is_some() && draft.sec_arch_id.is_some() {
            draft.sec_arch_id = None;
        }
        overlay(&mut draft.sec_arch_id, &self.sec_arch_id);
        overlay(&mut draft.action_plan_id, &self.action_plan_id);
        if self.expires_on.is_some() {
            draft.expires_on = self.expires_on;
        }

        draft
    }
}

fn overlay(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

/// Criteria selecting exceptions to remove. Omitted criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemovalCriteria {
    pub object_id: Option<String>,
    pub name_pattern: Option<String>,
    pub scope_type: Option<String>,
    pub role: Option<String>,
    pub scope_object_id: Option<String>,
    pub tenant: Option<String>,
}

impl RemovalCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
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

    pub fn with_scope_object_id(mut self, id: impl Into<String>) -> Self {
        self.scope_object_id = Some(id.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// True when no criterion is set, i.e. every record matches.
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }

    /// Check whether a record satisfies every supplied criterion.
    pub fn matches(&self, record: &ExceptionRecord) -> bool {
        let rule = &record.rule;

        let object_id_ok = self.object_id.as_deref().is_none_or(|wanted| {
            matches!(&rule.identity, Identity::ObjectId(id) if id.object_id.eq_ignore_ascii_case(wanted))
        });
        let pattern_ok = self.name_pattern.as_deref().is_none_or(|wanted| {
            matches!(&rule.identity, Identity::NamePattern(p) if p.effective_pattern().eq_ignore_ascii_case(&strip_wildcards(wanted)))
        });
        let tenant_ok = self.tenant.as_deref().is_none_or(|wanted| {
            matches!(&rule.identity, Identity::NamePattern(p) if p.tenant.matches_label(wanted))
        });
        let scope_type_ok = self
            .scope_type
            .as_deref()
            .is_none_or(|wanted| rule.scope_type.matches_label(wanted));
        let role_ok = self
            .role
            .as_deref()
            .is_none_or(|wanted| rule.role.matches_label(wanted));
        let scope_ok = self.scope_object_id.as_deref().is_none_or(|wanted| {
            matches!(&rule.scope, Some(Scope::ObjectId(s)) if s.scope_object_id.eq_ignore_ascii_case(wanted))
        });

        object_id_ok && pattern_ok && tenant_ok && scope_type_ok && role_ok && scope_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{Approval, ExceptionRule, Role, ScopeType, Tenant};
    use chrono::Utc;

    fn record(identity: Identity, scope: Option<Scope>, approval: Approval) -> ExceptionRecord {
        let now = Utc::now();
        ExceptionRecord {
            unique_id: "exc_test".to_string(),
            rule: ExceptionRule {
                identity,
                scope,
                scope_type: ScopeType::ResourceGroup,
                role: Role::Owner,
                approval,
            },
            created_on: now,
            last_modified_on: now,
            last_modified_by: "a@example.com".to_string(),
        }
    }

    fn sec_arch() -> Approval {
        Approval::SecArch {
            id: "SA1".to_string(),
        }
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let rec = record(Identity::object_id("SPN1"), Some(Scope::object_id("rg1")), sec_arch());
        let draft = ExceptionPatch::new()
            .with_role("Contributor")
            .apply_to(&rec, "b@example.com");
        let (rule, by) = draft.validate().unwrap();

        assert_eq!(rule.role, Role::Contributor);
        assert_eq!(rule.identity, rec.rule.identity);
        assert_eq!(rule.scope, rec.rule.scope);
        assert_eq!(by, "b@example.com");
    }

    #[test]
    fn test_patch_switches_identity_form() {
        let rec = record(Identity::object_id("SPN1"), None, sec_arch());
        let draft = ExceptionPatch::new()
            .with_name_pattern("sampleApp")
            .with_eon_id("EON1")
            .with_tenant("prod")
            .apply_to(&rec, "b@example.com");
        let (rule, _) = draft.validate().unwrap();
        assert_eq!(
            rule.identity,
            Identity::name_pattern("sampleApp", "EON1", Tenant::Prod)
        );
    }

    #[test]
    fn test_patch_switches_approval_form() {
        let rec = record(Identity::object_id("SPN1"), None, sec_arch());
        let expires = chrono::NaiveDate::from_ymd_opt(2031, 1, 31).unwrap();
        let (rule, _) = ExceptionPatch::new()
            .with_action_plan("AP9")
            .with_expires_on(expires)
            .apply_to(&rec, "b@example.com")
            .validate()
            .unwrap();
        assert_eq!(
            rule.approval,
            Approval::ActionPlan {
                id: "AP9".to_string(),
                expires_on: expires
            }
        );
    }

    #[test]
    fn test_patch_clears_scope() {
        let rec = record(Identity::object_id("SPN1"), Some(Scope::name_pattern("rg-")), sec_arch());
        let (rule, _) = ExceptionPatch::new()
            .clearing_scope()
            .apply_to(&rec, "b@example.com")
            .validate()
            .unwrap();
        assert_eq!(rule.scope, None);
    }

    #[test]
    fn test_removal_criteria() {
        let rec = record(Identity::object_id("SPN1"), Some(Scope::object_id("RG1")), sec_arch());

        assert!(RemovalCriteria::new().matches(&rec));
        assert!(RemovalCriteria::new().with_object_id("spn1").matches(&rec));
        assert!(
            RemovalCriteria::new()
                .with_object_id("SPN1")
                .with_role("owner")
                .with_scope_type("Resource Group")
                .with_scope_object_id("rg1")
                .matches(&rec)
        );
        assert!(!RemovalCriteria::new().with_object_id("SPN2").matches(&rec));
        assert!(!RemovalCriteria::new().with_name_pattern("SPN1").matches(&rec));
        assert!(!RemovalCriteria::new().with_tenant("prod").matches(&rec));
    }

    #[test]
    fn test_removal_by_pattern_ignores_wildcards() {
        let rec = record(
            Identity::name_pattern("*sampleApp*", "EON1", Tenant::Prod),
            None,
            sec_arch(),
        );

        assert!(RemovalCriteria::new().with_name_pattern("sampleApp").matches(&rec));
        assert!(RemovalCriteria::new().with_name_pattern("%SAMPLEAPP").matches(&rec));
        assert!(!RemovalCriteria::new().with_name_pattern("sample").matches(&rec));
    }
}
