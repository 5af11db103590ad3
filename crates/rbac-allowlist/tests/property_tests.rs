//! Property-based tests for exception validation, matching and persistence.
//!
//! These tests use proptest to generate random drafts, rows and stores and
//! verify that the core rules hold for all of them:
//!
//! 1. **Exclusivity**: a draft with both or neither identity (or approval)
//!    forms never validates
//! 2. **Expiry**: an expired ActionPlan exception never covers a row
//! 3. **Partition**: every row lands in exactly one side of an enforced pass
//! 4. **Round trip**: a saved store reloads to the same records
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p rbac-allowlist --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p rbac-allowlist --test property_tests
//! ```

use chrono::{Duration, NaiveDate, Utc};
use proptest::prelude::*;
use tempfile::TempDir;

use rbac_allowlist::{
    AllowlistError, Approval, DatasetRow, ExceptionDraft, ExceptionRecord, ExceptionRule,
    ExceptionStore, FilterPass, Identity, Matcher, Role, ScopeType, StoreLayout, StoreOptions,
    Tenant, ValidationRule,
};

// =============================================================================
// Test Strategies
// =============================================================================

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9_\\-]{0,20}"
}

fn scope_type() -> impl Strategy<Value = ScopeType> {
    prop_oneof![
        Just(ScopeType::ManagementGroup),
        Just(ScopeType::ResourceGroup),
        Just(ScopeType::Subscription),
    ]
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Owner),
        Just(Role::Contributor),
        Just(Role::UserAccessAdministrator),
        Just(Role::AppDevContributor),
    ]
}

fn tenant() -> impl Strategy<Value = Tenant> {
    prop_oneof![Just(Tenant::Prod), Just(Tenant::NonProd)]
}

fn day() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn approval() -> impl Strategy<Value = Approval> {
    prop_oneof![
        identifier().prop_map(|id| Approval::SecArch { id }),
        (identifier(), day()).prop_map(|(id, expires_on)| Approval::ActionPlan { id, expires_on }),
    ]
}

fn identity() -> impl Strategy<Value = Identity> {
    prop_oneof![
        identifier().prop_map(Identity::object_id),
        (identifier(), identifier(), tenant())
            .prop_map(|(pattern, eon, tenant)| Identity::name_pattern(pattern, eon, tenant)),
    ]
}

fn rule() -> impl Strategy<Value = ExceptionRule> {
    (identity(), scope_type(), role(), approval()).prop_map(
        |(identity, scope_type, role, approval)| ExceptionRule {
            identity,
            scope: None,
            scope_type,
            role,
            approval,
        },
    )
}

fn row() -> impl Strategy<Value = DatasetRow> {
    (identifier(), identifier(), scope_type(), role(), identifier(), tenant()).prop_map(
        |(object_id, name, scope_type, role, eon, tenant)| {
            DatasetRow::new(object_id, name)
                .with_scope(scope_type.to_string(), "scope-1", "scope-name")
                .with_role(role.to_string())
                .with_owner(eon, tenant.to_string())
        },
    )
}

fn record(index: usize, rule: ExceptionRule) -> ExceptionRecord {
    let now = Utc::now();
    ExceptionRecord {
        unique_id: format!("exc_{:04}", index),
        rule,
        created_on: now,
        last_modified_on: now,
        last_modified_by: "owner@example.com".to_string(),
    }
}

/// A row that satisfies every attribute of `rule` except possibly expiry.
fn covered_row(rule: &ExceptionRule) -> DatasetRow {
    let row = match &rule.identity {
        Identity::ObjectId(id) => DatasetRow::new(id.object_id.clone(), "any"),
        Identity::NamePattern(p) => DatasetRow::new("any", format!("x-{}-y", p.name_pattern))
            .with_owner(p.eon_id.clone(), p.tenant.to_string()),
    };
    row.with_scope(rule.scope_type.to_string(), "scope-1", "scope-name")
        .with_role(rule.role.to_string())
}

// =============================================================================
// Validation
// =============================================================================

proptest! {
    #[test]
    fn both_identity_forms_never_validate(
        object_id in identifier(),
        pattern in identifier(),
        approval_id in identifier(),
    ) {
        let draft = ExceptionDraft::new()
            .with_object_id(object_id)
            .with_name_pattern(pattern)
            .with_eon_id("EON1")
            .with_tenant("prod")
            .with_scope_type("rg")
            .with_role("Owner")
            .with_sec_arch(approval_id)
            .with_modified_by("owner@example.com");

        prop_assert!(matches!(
            draft.validate(),
            Err(AllowlistError::Validation(ValidationRule::ConflictingIdentity))
        ));
    }

    #[test]
    fn both_or_neither_approval_never_validates(
        object_id in identifier(),
        sec_arch in identifier(),
        action_plan in identifier(),
        expires_on in day(),
        include_both in any::<bool>(),
    ) {
        let mut draft = ExceptionDraft::new()
            .with_object_id(object_id)
            .with_scope_type("rg")
            .with_role("Owner")
            .with_modified_by("owner@example.com");
        if include_both {
            draft = draft.with_sec_arch(sec_arch).with_action_plan(action_plan, expires_on);
        }

        let expected = if include_both {
            ValidationRule::ConflictingApproval
        } else {
            ValidationRule::MissingApproval
        };
        match draft.validate() {
            Err(AllowlistError::Validation(rule)) => prop_assert_eq!(rule, expected),
            other => prop_assert!(false, "expected validation error, got {:?}", other),
        }
    }
}

// =============================================================================
// Matching
// =============================================================================

proptest! {
    #[test]
    fn expired_action_plan_never_matches(
        rule in rule(),
        days_past in 1i64..1000,
    ) {
        let Some(expires_on) = rule.approval.expires_on() else {
            return Ok(());
        };
        let exception = record(0, rule);
        let row = covered_row(&exception.rule);

        let after = Matcher::as_of(expires_on + Duration::days(days_past));
        prop_assert!(!after.matches(&row, &exception));

        // Still honoured on the expiry date itself.
        prop_assert!(Matcher::as_of(expires_on).matches(&row, &exception));
    }

    #[test]
    fn enforced_pass_partitions_rows(
        rows in prop::collection::vec(row(), 0..30),
        rules in prop::collection::vec(rule(), 0..10),
        today in day(),
    ) {
        let exceptions: Vec<_> = rules.into_iter().enumerate().map(|(i, r)| record(i, r)).collect();
        let outcome = FilterPass::new(Matcher::as_of(today)).partition(&rows, &exceptions);

        prop_assert_eq!(outcome.suppressed.len() + outcome.remaining.len(), rows.len());
        prop_assert!(outcome.suppressed.iter().all(|r| r.matched.is_some()));
        prop_assert!(outcome.remaining.iter().all(|r| r.matched.is_none()));
    }

    #[test]
    fn report_only_pass_keeps_every_row(
        rows in prop::collection::vec(row(), 0..30),
        rules in prop::collection::vec(rule(), 0..10),
        today in day(),
    ) {
        let exceptions: Vec<_> = rules.into_iter().enumerate().map(|(i, r)| record(i, r)).collect();
        let outcome = FilterPass::new(Matcher::as_of(today))
            .with_enforcement(false)
            .partition(&rows, &exceptions);

        prop_assert_eq!(outcome.remaining.len(), rows.len());
    }
}

// =============================================================================
// Persistence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn store_round_trip_preserves_records(
        rules in prop::collection::vec(rule(), 0..8),
        partitioned in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exceptions.json");
        let options = StoreOptions {
            default_layout: if partitioned { StoreLayout::Partitioned } else { StoreLayout::Flat },
            ..StoreOptions::default()
        };

        let mut store = ExceptionStore::open_with(&path, options).unwrap();
        for rule in &rules {
            let draft = ExceptionDraft::from_rule(rule, Some("owner@example.com".to_string()));
            match store.add(&draft) {
                Ok(_) | Err(AllowlistError::Duplicate { .. }) => {}
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }
        store.save().unwrap();

        let reopened = ExceptionStore::open(&path).unwrap();
        prop_assert_eq!(reopened.records(), store.records());
        prop_assert_eq!(reopened.layout(), store.layout());
    }
}
