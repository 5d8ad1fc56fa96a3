//! Roles and permission groups
//!
//! This module defines the role record compiled into rules and the
//! permission group namespace that scopes rule keys.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionSet};

/// Namespace used to keep rule keys of unrelated rule sets apart.
///
/// Rule keys are `group:roleName`, so the group must be non-empty and must
/// not itself contain a `:`.
///
/// # Examples
///
/// ```
/// use warden_rbac::PermissionsGroup;
///
/// let group = PermissionsGroup::default();
/// assert_eq!(group.as_str(), "DEFAULT");
/// assert_eq!(group.rule_key("admin"), "DEFAULT:admin");
///
/// assert!(PermissionsGroup::parse("billing").is_ok());
/// assert!(PermissionsGroup::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionsGroup(String);

impl PermissionsGroup {
    /// Name of the group used when none is configured.
    pub const DEFAULT: &'static str = "DEFAULT";

    /// Parse a group name.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::Validation`] for empty names or names containing `:`
    pub fn parse(name: impl Into<String>) -> RbacResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RbacError::Validation(
                "permissions group must not be empty".to_string(),
            ));
        }
        if name.contains(':') {
            return Err(RbacError::Validation(format!(
                "permissions group `{name}` must not contain ':'"
            )));
        }
        Ok(Self(name))
    }

    /// Get the group name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the rule key for a role within this group.
    pub fn rule_key(&self, role_name: &str) -> String {
        format!("{}:{}", self.0, role_name)
    }
}

impl Default for PermissionsGroup {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for PermissionsGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PermissionsGroup {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PermissionsGroup> for String {
    fn from(value: PermissionsGroup) -> Self {
        value.0
    }
}

/// A named role owning an ordered, deduplicated set of permissions.
///
/// # Examples
///
/// ```
/// use warden_rbac::Role;
///
/// let role = Role::new(1, "editor").with_permissions(["update", "Update", "read"]);
/// assert_eq!(role.permissions.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role ID
    pub id: u64,

    /// Role name, used in rule keys
    pub name: String,

    /// Permissions granted by the role
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl Role {
    /// Creates a role with no permissions.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            permissions: PermissionSet::new(),
        }
    }

    /// Adds permissions to the role, dropping duplicates.
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.permissions
            .add_all(permissions.into_iter().map(|p| Permission::new(p.as_ref())));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rejects_separator() {
        assert!(PermissionsGroup::parse("a:b").is_err());
        assert!(PermissionsGroup::parse("").unwrap_err().is_validation());
    }

    #[test]
    fn test_group_rule_key() {
        let group = PermissionsGroup::parse("TEST_PERMISSION_GROUP").unwrap();
        assert_eq!(group.rule_key("TEST_ROLE_1"), "TEST_PERMISSION_GROUP:TEST_ROLE_1");
    }

    #[test]
    fn test_group_deserialize_validates() {
        let ok: Result<PermissionsGroup, _> = serde_json::from_str("\"apps\"");
        assert!(ok.is_ok());
        let bad: Result<PermissionsGroup, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_role_permissions_deduplicated() {
        let role = Role::new(1, "TEST_ROLE_1").with_permissions(["update", "delete", "UPDATE"]);
        assert_eq!(role.permissions.len(), 2);
        assert_eq!(role.name, "TEST_ROLE_1");
    }
}
