//! CLI argument definitions using clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use rbac_allowlist::{ExceptionDraft, ExceptionPatch, FilterMode, OutputFormat, RemovalCriteria};

/// rbac-allowlist: approved exceptions for Azure RBAC audit findings
#[derive(Parser)]
#[command(name = "rbac-allowlist")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exception store file (overrides exceptionsPath)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new approved exception
    Add {
        #[command(flatten)]
        identity: IdentityArgs,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Scope type (managementGroup, resourceGroup, subscription)
        #[arg(long)]
        scope_type: String,

        /// Role (Owner, Contributor, UserAccessAdministrator, AppDevContributor)
        #[arg(long)]
        role: String,

        #[command(flatten)]
        approval: ApprovalArgs,

        /// Email of the person recording the exception
        #[arg(long, value_name = "EMAIL")]
        modified_by: String,
    },

    /// Change fields of an existing exception
    Update {
        /// Unique id of the exception
        #[arg(value_name = "UNIQUE_ID")]
        id: String,

        #[command(flatten)]
        identity: IdentityArgs,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Remove the scope restriction
        #[arg(long, conflicts_with_all = ["scope_object_id", "scope_name_pattern"])]
        clear_scope: bool,

        /// New scope type
        #[arg(long)]
        scope_type: Option<String>,

        /// New role
        #[arg(long)]
        role: Option<String>,

        #[command(flatten)]
        approval: ApprovalArgs,

        /// Email of the person making the change
        #[arg(long, value_name = "EMAIL")]
        modified_by: String,
    },

    /// Remove exceptions matching all given criteria, or one by id
    #[command(group(
        ArgGroup::new("criteria")
            .required(true)
            .multiple(true)
            .args(["id", "object_id", "name_pattern", "scope_type", "role", "scope_object_id", "tenant"])
    ))]
    Remove {
        /// Unique id of a single exception
        #[arg(long, conflicts_with_all = ["object_id", "name_pattern", "scope_type", "role", "scope_object_id", "tenant"])]
        id: Option<String>,

        #[arg(long)]
        object_id: Option<String>,

        #[arg(long)]
        name_pattern: Option<String>,

        #[arg(long)]
        scope_type: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        scope_object_id: Option<String>,

        #[arg(long)]
        tenant: Option<String>,
    },

    /// List stored exceptions
    List {
        /// Only ActionPlan exceptions that have expired
        #[arg(long)]
        expired: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Filter an audit dataset against the stored exceptions
    Filter {
        /// Dataset file (default: newest export in datasetDir)
        #[arg(short, long, value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Which rows to return
        #[arg(short, long, default_value = "remaining")]
        mode: FilterMode,

        /// Output file (default: print a summary only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,

        /// Evaluate ActionPlan expiry as of this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        as_of: Option<NaiveDate>,
    },

    /// Show the newest dataset export in the configured directory
    GetDataset {
        /// Dataset directory (overrides datasetDir)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// File name prefix (overrides filenamePattern)
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(Args, Default)]
pub struct IdentityArgs {
    /// Exact object id of the Service Principal or Azure object
    #[arg(long)]
    pub object_id: Option<String>,

    /// Display-name pattern (wildcards are ignored; substring match)
    #[arg(long)]
    pub name_pattern: Option<String>,

    /// EonID of the owning application (required with --name-pattern)
    #[arg(long)]
    pub eon_id: Option<String>,

    /// Tenant (prod, nonprod; required with --name-pattern)
    #[arg(long)]
    pub tenant: Option<String>,
}

#[derive(Args, Default)]
pub struct ScopeArgs {
    /// Restrict to one scope object id
    #[arg(long)]
    pub scope_object_id: Option<String>,

    /// Restrict to scopes whose display name contains this pattern
    #[arg(long)]
    pub scope_name_pattern: Option<String>,
}

#[derive(Args, Default)]
pub struct ApprovalArgs {
    /// Permanent SecArch approval id
    #[arg(long)]
    pub sec_arch_id: Option<String>,

    /// Time-bound ActionPlan approval id
    #[arg(long)]
    pub action_plan_id: Option<String>,

    /// ActionPlan expiry date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub expires_on: Option<NaiveDate>,
}

/// Assemble an unvalidated draft; validation happens in the library.
pub fn build_draft(
    identity: IdentityArgs,
    scope: ScopeArgs,
    scope_type: String,
    role: String,
    approval: ApprovalArgs,
    modified_by: String,
) -> ExceptionDraft {
    ExceptionDraft {
        object_id: identity.object_id,
        name_pattern: identity.name_pattern,
        eon_id: identity.eon_id,
        tenant: identity.tenant,
        scope_object_id: scope.scope_object_id,
        scope_name_pattern: scope.scope_name_pattern,
        scope_type: Some(scope_type),
        role: Some(role),
        sec_arch_id: approval.sec_arch_id,
        action_plan_id: approval.action_plan_id,
        expires_on: approval.expires_on,
        modified_by: Some(modified_by),
    }
}

pub fn build_patch(
    identity: IdentityArgs,
    scope: ScopeArgs,
    clear_scope: bool,
    scope_type: Option<String>,
    role: Option<String>,
    approval: ApprovalArgs,
) -> ExceptionPatch {
    ExceptionPatch {
        object_id: identity.object_id,
        name_pattern: identity.name_pattern,
        eon_id: identity.eon_id,
        tenant: identity.tenant,
        scope_object_id: scope.scope_object_id,
        scope_name_pattern: scope.scope_name_pattern,
        clear_scope,
        scope_type,
        role,
        sec_arch_id: approval.sec_arch_id,
        action_plan_id: approval.action_plan_id,
        expires_on: approval.expires_on,
    }
}

pub fn build_criteria(
    object_id: Option<String>,
    name_pattern: Option<String>,
    scope_type: Option<String>,
    role: Option<String>,
    scope_object_id: Option<String>,
    tenant: Option<String>,
) -> RemovalCriteria {
    RemovalCriteria {
        object_id,
        name_pattern,
        scope_type,
        role,
        scope_object_id,
        tenant,
    }
}
