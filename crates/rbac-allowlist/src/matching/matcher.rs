//! Deciding whether a dataset row is covered by an exception.

use chrono::{NaiveDate, Utc};

use crate::exception::{ExceptionRecord, Identity, Scope};
use crate::input::DatasetRow;

/// Case-insensitive substring test.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Evaluates rows against exceptions as of a fixed date.
///
/// A row is covered when all of the following hold:
///
/// 1. **Identity**: an exact exception's object id equals the row's object id;
///    a wildcard exception's pattern (wildcard tokens stripped) is a substring
///    of the row's display name, and the row's EonID and tenant agree.
/// 2. **Scope**: the scope object id equals the row's, or the scope pattern is
///    a substring of the row's scope display name. No scope matches any.
/// 3. **Attributes**: role and scope type agree.
/// 4. **Expiry**: the approval is not an ActionPlan that expired before today.
///
/// All comparisons ignore case.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    today: NaiveDate,
}

impl Matcher {
    /// A matcher evaluating expiry against the current UTC date.
    pub fn new() -> Self {
        Self::as_of(Utc::now().date_naive())
    }

    /// A matcher evaluating expiry against a given date.
    pub fn as_of(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn matches(&self, row: &DatasetRow, exception: &ExceptionRecord) -> bool {
        let rule = &exception.rule;

        if rule.approval.is_expired(self.today) {
            return false;
        }

        identity_matches(row, &rule.identity)
            && scope_matches(row, rule.scope.as_ref())
            && rule.role.matches_label(&row.role)
            && rule.scope_type.matches_label(&row.scope_type)
    }

    /// The first exception, in store order, covering the row.
    pub fn first_match<'a>(
        &self,
        row: &DatasetRow,
        exceptions: &'a [ExceptionRecord],
    ) -> Option<&'a ExceptionRecord> {
        exceptions.iter().find(|exception| self.matches(row, exception))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

fn identity_matches(row: &DatasetRow, identity: &Identity) -> bool {
    match identity {
        Identity::ObjectId(id) => row.object_id.trim().eq_ignore_ascii_case(id.object_id.trim()),
        Identity::NamePattern(pattern) => {
            let needle = pattern.effective_pattern();
            !needle.is_empty()
                && contains_ignore_case(&row.display_name, &needle)
                && row.owning_app_id.trim().eq_ignore_ascii_case(pattern.eon_id.trim())
                && pattern.tenant.matches_label(&row.tenant)
        }
    }
}

fn scope_matches(row: &DatasetRow, scope: Option<&Scope>) -> bool {
    match scope {
        None => true,
        Some(Scope::ObjectId(s)) => row
            .scope_object_id
            .trim()
            .eq_ignore_ascii_case(s.scope_object_id.trim()),
        Some(Scope::NamePattern(s)) => {
            let needle = s.effective_pattern();
            contains_ignore_case(&row.scope_display_name, &needle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{Approval, ExceptionRule, Role, ScopeType, Tenant};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn exception(
        identity: Identity,
        scope: Option<Scope>,
        scope_type: ScopeType,
        role: Role,
        approval: Approval,
    ) -> ExceptionRecord {
        let now = Utc::now();
        ExceptionRecord {
            unique_id: "exc_test".to_string(),
            rule: ExceptionRule {
                identity,
                scope,
                scope_type,
                role,
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

    fn action_plan(expires_on: NaiveDate) -> Approval {
        Approval::ActionPlan {
            id: "AP1".to_string(),
            expires_on,
        }
    }

    #[test]
    fn test_exact_identity_match() {
        let exc = exception(
            Identity::object_id("SPN1"),
            None,
            ScopeType::ResourceGroup,
            Role::Owner,
            sec_arch(),
        );
        let row = DatasetRow::new("spn1", "whatever")
            .with_scope("resourceGroup", "", "")
            .with_role("Owner");

        assert!(Matcher::new().matches(&row, &exc));
    }

    #[test]
    fn test_role_and_scope_type_must_agree() {
        let exc = exception(
            Identity::object_id("SPN1"),
            None,
            ScopeType::ResourceGroup,
            Role::Owner,
            sec_arch(),
        );
        let wrong_role = DatasetRow::new("SPN1", "x")
            .with_scope("resourceGroup", "", "")
            .with_role("Contributor");
        let wrong_scope = DatasetRow::new("SPN1", "x")
            .with_scope("subscription", "", "")
            .with_role("Owner");

        assert!(!Matcher::new().matches(&wrong_role, &exc));
        assert!(!Matcher::new().matches(&wrong_scope, &exc));
    }

    #[test]
    fn test_wildcard_identity_match() {
        let exc = exception(
            Identity::name_pattern("*sampleApp*", "EON1", Tenant::Prod),
            None,
            ScopeType::ManagementGroup,
            Role::Contributor,
            sec_arch(),
        );
        let row = DatasetRow::new("spn-77", "spn-SAMPLEAPP-deploy")
            .with_scope("Management Group", "mg-1", "Root")
            .with_role("contributor")
            .with_owner("eon1", "PROD");
        assert!(Matcher::new().matches(&row, &exc));

        let other_app = row.clone().with_owner("EON2", "prod");
        assert!(!Matcher::new().matches(&other_app, &exc));

        let other_tenant = row.clone().with_owner("EON1", "nonprod");
        assert!(!Matcher::new().matches(&other_tenant, &exc));

        let other_name = DatasetRow {
            display_name: "unrelated".to_string(),
            ..row
        };
        assert!(!Matcher::new().matches(&other_name, &exc));
    }

    #[test]
    fn test_scope_object_and_pattern() {
        let by_id = exception(
            Identity::object_id("SPN1"),
            Some(Scope::object_id("/subscriptions/abc/resourceGroups/rg-app")),
            ScopeType::ResourceGroup,
            Role::Owner,
            sec_arch(),
        );
        let by_name = exception(
            Identity::object_id("SPN1"),
            Some(Scope::name_pattern("rg-app")),
            ScopeType::ResourceGroup,
            Role::Owner,
            sec_arch(),
        );
        let row = DatasetRow::new("SPN1", "x")
            .with_scope(
                "resourceGroup",
                "/SUBSCRIPTIONS/abc/resourceGroups/rg-app",
                "RG-APP-prod",
            )
            .with_role("Owner");

        assert!(Matcher::new().matches(&row, &by_id));
        assert!(Matcher::new().matches(&row, &by_name));

        let elsewhere = row.clone().with_scope("resourceGroup", "/other", "rg-other");
        assert!(!Matcher::new().matches(&elsewhere, &by_id));
        assert!(!Matcher::new().matches(&elsewhere, &by_name));
    }

    #[test]
    fn test_expired_action_plan_is_inert() {
        let exc = exception(
            Identity::name_pattern("sampleApp", "EON1", Tenant::Prod),
            None,
            ScopeType::ManagementGroup,
            Role::Contributor,
            action_plan(date(2020, 1, 1)),
        );
        let row = DatasetRow::new("spn", "sampleApp")
            .with_scope("managementGroup", "", "")
            .with_role("Contributor")
            .with_owner("EON1", "prod");

        assert!(!Matcher::new().matches(&row, &exc));
        assert!(!Matcher::as_of(date(2020, 1, 2)).matches(&row, &exc));
        assert!(Matcher::as_of(date(2020, 1, 1)).matches(&row, &exc));
        assert!(Matcher::as_of(date(2019, 12, 31)).matches(&row, &exc));
    }

    #[test]
    fn test_first_match_uses_store_order() {
        let first = ExceptionRecord {
            unique_id: "exc_first".to_string(),
            ..exception(
                Identity::object_id("SPN1"),
                None,
                ScopeType::ResourceGroup,
                Role::Owner,
                sec_arch(),
            )
        };
        let second = ExceptionRecord {
            unique_id: "exc_second".to_string(),
            ..first.clone()
        };
        let row = DatasetRow::new("SPN1", "x")
            .with_scope("resourceGroup", "", "")
            .with_role("Owner");
        let exceptions = vec![first, second];

        let hit = Matcher::new().first_match(&row, &exceptions).unwrap();
        assert_eq!(hit.unique_id, "exc_first");
    }
}
