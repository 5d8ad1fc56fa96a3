//! # Permissions
//!
//! Core permission types and sets for the decision engine.
//! A permission is an opaque capability string compared case-insensitively.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An opaque capability identifier (e.g. `"users:read"`).
///
/// Comparison, hashing and ordering use the lower-cased form, so
/// deduplication is case-insensitive. The spelling the permission was
/// created with is kept and is what gets serialized.
///
/// # Example
///
/// ```
/// use warden_rbac::permissions::Permission;
///
/// let perm = Permission::new("Users:Read");
/// assert_eq!(perm.as_str(), "users:read");
/// assert_eq!(perm.name(), "Users:Read");
/// assert_eq!(perm, Permission::new("USERS:READ"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Permission {
    key: String,
    name: String,
}

impl Permission {
    /// Create a permission from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self {
            key: name.to_lowercase(),
            name: name.to_string(),
        }
    }

    /// Get the normalised (lower-cased) form used for comparison.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Get the name as originally written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether the permission name is empty.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Permission {}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.name
    }
}

/// An insertion-ordered set of permissions.
///
/// Duplicates (compared case-insensitively) are dropped on insertion, so the
/// set preserves the order in which permissions were first seen. That order
/// matters for requests, which are "ordered sets of strings".
///
/// # Example
///
/// ```
/// use warden_rbac::permissions::{Permission, PermissionSet};
///
/// let mut set = PermissionSet::new();
/// set.add(Permission::new("users:read"));
/// set.add(Permission::new("USERS:READ"));
/// set.add(Permission::new("users:create"));
///
/// assert_eq!(set.len(), 2);
/// assert!(set.has(&Permission::new("users:create")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: Vec<Permission>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self {
            permissions: Vec::new(),
        }
    }

    /// Add a permission to the set.
    ///
    /// # Returns
    ///
    /// `true` if the permission was not already present
    pub fn add(&mut self, permission: Permission) -> bool {
        if self.has(&permission) {
            return false;
        }
        self.permissions.push(permission);
        true
    }

    /// Add multiple permissions to the set.
    pub fn add_all<I>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = Permission>,
    {
        for perm in permissions {
            self.add(perm);
        }
    }

    /// Remove a permission from the set.
    ///
    /// # Returns
    ///
    /// `true` if the permission was present, `false` otherwise
    pub fn remove(&mut self, permission: &Permission) -> bool {
        let before = self.permissions.len();
        self.permissions.retain(|p| p != permission);
        before != self.permissions.len()
    }

    /// Check if the set contains a permission.
    pub fn has(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Iterate over the permissions in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Permission> {
        self.permissions.iter()
    }

    /// Get the permissions as a slice.
    pub fn as_slice(&self) -> &[Permission] {
        &self.permissions
    }

    /// Merge another permission set into this one, keeping first-seen order.
    pub fn merge(&mut self, other: &PermissionSet) {
        for perm in &other.permissions {
            self.add(perm.clone());
        }
    }

    /// Create from a list of permission strings.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_rbac::permissions::PermissionSet;
    ///
    /// let set = PermissionSet::from_strings(&["users:read", "users:create", "Users:Read"]);
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn from_strings<S: AsRef<str>>(perms: &[S]) -> Self {
        perms.iter().map(|p| Permission::new(p.as_ref())).collect()
    }

    /// Get the count of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Check if this set contains all permissions from another set.
    pub fn contains_all(&self, other: &PermissionSet) -> bool {
        other.iter().all(|perm| self.has(perm))
    }

    /// Check if this set contains any permission from another set.
    pub fn contains_any(&self, other: &PermissionSet) -> bool {
        other.iter().any(|perm| self.has(perm))
    }

    /// Count the permissions of `other` that are also in this set.
    pub fn intersection_len(&self, other: &PermissionSet) -> usize {
        other.iter().filter(|perm| self.has(perm)).count()
    }

    /// Order-insensitive equality: both sets hold exactly the same members.
    pub fn same_members(&self, other: &PermissionSet) -> bool {
        self.len() == other.len() && self.contains_all(other)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = PermissionSet::new();
        set.add_all(iter);
        set
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = std::vec::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.iter()
    }
}
