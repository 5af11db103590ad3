//! Enumerated attributes shared by exceptions and dataset rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationRule;

/// Normalize a label for comparison: lowercase, ignoring spaces, `_` and `-`.
pub(crate) fn normalize_label(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// The Azure resource container level an assignment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeType {
    ManagementGroup,
    ResourceGroup,
    Subscription,
}

impl ScopeType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ScopeType::ManagementGroup => "Management Group",
            ScopeType::ResourceGroup => "Resource Group",
            ScopeType::Subscription => "Subscription",
        }
    }

    /// Check whether a dataset value names this scope type.
    pub fn matches_label(&self, value: &str) -> bool {
        value.parse::<ScopeType>().is_ok_and(|parsed| parsed == *self)
    }
}

impl FromStr for ScopeType {
    type Err = ValidationRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "managementgroup" | "managementgroups" | "mg" => Ok(ScopeType::ManagementGroup),
            "resourcegroup" | "resourcegroups" | "rg" => Ok(ScopeType::ResourceGroup),
            "subscription" | "subscriptions" | "sub" => Ok(ScopeType::Subscription),
            _ => Err(ValidationRule::UnknownValue {
                field: "scope type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeType::ManagementGroup => write!(f, "managementGroup"),
            ScopeType::ResourceGroup => write!(f, "resourceGroup"),
            ScopeType::Subscription => write!(f, "subscription"),
        }
    }
}

/// The privileged role granted by an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Contributor,
    UserAccessAdministrator,
    AppDevContributor,
}

impl Role {
    /// Get the role name as Azure displays it.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Contributor => "Contributor",
            Role::UserAccessAdministrator => "User Access Administrator",
            Role::AppDevContributor => "AppDevContributor",
        }
    }

    /// Check whether a dataset value names this role.
    pub fn matches_label(&self, value: &str) -> bool {
        value.parse::<Role>().is_ok_and(|parsed| parsed == *self)
    }
}

impl FromStr for Role {
    type Err = ValidationRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "owner" => Ok(Role::Owner),
            "contributor" => Ok(Role::Contributor),
            "useraccessadministrator" | "uaa" => Ok(Role::UserAccessAdministrator),
            "appdevcontributor" => Ok(Role::AppDevContributor),
            _ => Err(ValidationRule::UnknownValue {
                field: "role",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "Owner"),
            Role::Contributor => write!(f, "Contributor"),
            Role::UserAccessAdministrator => write!(f, "UserAccessAdministrator"),
            Role::AppDevContributor => write!(f, "AppDevContributor"),
        }
    }
}

/// The Azure AD tenant a finding was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tenant {
    Prod,
    NonProd,
}

impl Tenant {
    /// Check whether a dataset value names this tenant.
    pub fn matches_label(&self, value: &str) -> bool {
        value.parse::<Tenant>().is_ok_and(|parsed| parsed == *self)
    }
}

impl FromStr for Tenant {
    type Err = ValidationRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "prod" | "production" => Ok(Tenant::Prod),
            "nonprod" | "nonproduction" => Ok(Tenant::NonProd),
            _ => Err(ValidationRule::UnknownValue {
                field: "tenant",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tenant::Prod => write!(f, "prod"),
            Tenant::NonProd => write!(f, "nonprod"),
        }
    }
}
