//! Fuzz target for draft validation.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rbac_allowlist::ExceptionDraft;

#[derive(Arbitrary, Debug)]
struct Input {
    object_id: Option<String>,
    name_pattern: Option<String>,
    eon_id: Option<String>,
    tenant: Option<String>,
    scope_object_id: Option<String>,
    scope_name_pattern: Option<String>,
    scope_type: Option<String>,
    role: Option<String>,
    sec_arch_id: Option<String>,
    action_plan_id: Option<String>,
    expires_in_days: Option<u16>,
    modified_by: Option<String>,
}

fuzz_target!(|input: Input| {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let draft = ExceptionDraft {
        object_id: input.object_id,
        name_pattern: input.name_pattern,
        eon_id: input.eon_id,
        tenant: input.tenant,
        scope_object_id: input.scope_object_id,
        scope_name_pattern: input.scope_name_pattern,
        scope_type: input.scope_type,
        role: input.role,
        sec_arch_id: input.sec_arch_id,
        action_plan_id: input.action_plan_id,
        expires_on: input
            .expires_in_days
            .map(|days| base + chrono::Duration::days(days as i64)),
        modified_by: input.modified_by,
    };

    if let Ok((rule, _)) = draft.validate() {
        // A valid draft must survive a rebuild unchanged.
        let rebuilt = ExceptionDraft::from_rule(&rule, Some("a@example.com".into()));
        assert_eq!(rebuilt.validate().map(|(r, _)| r).ok(), Some(rule));
    }
});
